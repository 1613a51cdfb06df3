//! Host functions callable from expressions: `{{ name(arg1, arg2) }}`.
//!
//! A function is supplied per compile call. Synchronous functions run on
//! both compile paths; asynchronous ones are awaited by the async path and
//! replaced by a placeholder on the sync path.

use std::error::Error;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;

/// The error a host function reports.
pub type FunctionError = Box<dyn Error + Send + Sync>;

/// The result of calling a host function.
pub type FunctionResult = Result<Value, FunctionError>;

/// A synchronous function body.
pub type SyncFunction = Arc<dyn Fn(&[Value]) -> FunctionResult + Send + Sync>;

/// An asynchronous function body, returning a boxed future.
pub type AsyncFunction = Arc<dyn Fn(Vec<Value>) -> BoxFuture<'static, FunctionResult> + Send + Sync>;

/// How a function produces its result.
#[derive(Clone)]
pub enum FunctionBody {
    /// Runs on both compile paths.
    Sync(SyncFunction),
    /// Awaited by the async path only.
    Async(AsyncFunction),
}

/// A named host function.
#[derive(Clone)]
pub struct TemplateFunction {
    /// The name used in call expressions.
    pub name: String,
    /// The function itself.
    pub body: FunctionBody,
}

impl fmt::Debug for TemplateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.body {
            FunctionBody::Sync(_) => "sync",
            FunctionBody::Async(_) => "async",
        };
        f.debug_struct("TemplateFunction")
            .field("name", &self.name)
            .field("kind", &kind)
            .finish()
    }
}

impl TemplateFunction {
    /// Creates a synchronous function.
    pub fn new<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&[Value]) -> FunctionResult + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            body: FunctionBody::Sync(Arc::new(f)),
        }
    }

    /// Creates an asynchronous function.
    pub fn new_async<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = FunctionResult> + Send + 'static,
    {
        Self {
            name: name.into(),
            body: FunctionBody::Async(Arc::new(move |args| f(args).boxed())),
        }
    }

    /// Returns `true` for asynchronous functions.
    pub const fn is_async(&self) -> bool {
        matches!(self.body, FunctionBody::Async(_))
    }

    /// Finds a function by name. The first match wins.
    pub fn find<'f>(functions: &'f [Self], name: &str) -> Option<&'f Self> {
        functions.iter().find(|f| f.name == name)
    }
}
