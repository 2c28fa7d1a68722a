//! Handler system.
//!
//! Any async function whose parameters implement [`ContextParam`] is a
//! [`Handler`]. The parameter list is read once at registration through
//! [`Handler::parameter_types`]; at call time the handler receives its
//! arguments already rearranged into declared order.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use mcb_core::{BoxedBot, Message};
//!
//! // No parameters at all
//! async fn ping() {}
//!
//! // Any subset of the category's context, in any order
//! async fn echo(bot: BoxedBot, message: Arc<Message>) -> Result<(), ApiError> {
//!     if let Some(text) = &message.text {
//!         bot.send_text(message.chat.id, text).await?;
//!     }
//!     Ok(())
//! }
//! ```

use std::any::type_name;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::{BoxError, HandlerError, HandlerResult};
use mcb_core::{ContextParam, ContextValue, ExtractError, SignatureError, TypeDescriptor};

// ============================================================================
// IntoHandlerResult - Normalize handler return values
// ============================================================================

/// Return types a handler may have.
pub trait IntoHandlerResult: Send {
    fn into_handler_result(self) -> HandlerResult;
}

impl IntoHandlerResult for () {
    fn into_handler_result(self) -> HandlerResult {
        Ok(())
    }
}

/// `Err` values are reported as [`HandlerError::Failed`].
impl<E> IntoHandlerResult for Result<(), E>
where
    E: Into<BoxError> + Send,
{
    fn into_handler_result(self) -> HandlerResult {
        self.map_err(HandlerError::failed)
    }
}

// ============================================================================
// Handler Trait
// ============================================================================

/// The core trait for event handlers.
///
/// Implemented for async functions and closures taking 0-8 parameters that
/// implement [`ContextParam`] and returning `()` or `Result<(), E>`.
pub trait Handler<T>: Clone + Send + Sync + 'static {
    /// The declared parameter types, in declaration order.
    fn parameter_types() -> Vec<&'static TypeDescriptor>;

    /// Calls the handler with arguments in declared order.
    fn call(self, args: Vec<Option<ContextValue>>) -> BoxFuture<'static, HandlerResult>;
}

macro_rules! impl_handler {
    (
        $($ty:ident),*
    ) => {
        #[allow(non_snake_case, unused_mut, unused_variables)]
        impl<F, Fut, Res, $($ty,)*> Handler<($($ty,)*)> for F
        where
            F: FnOnce($($ty,)*) -> Fut + Clone + Send + Sync + 'static,
            Fut: Future<Output = Res> + Send + 'static,
            Res: IntoHandlerResult,
            $( $ty: ContextParam, )*
        {
            fn parameter_types() -> Vec<&'static TypeDescriptor> {
                vec![$($ty::descriptor(),)*]
            }

            fn call(self, args: Vec<Option<ContextValue>>) -> BoxFuture<'static, HandlerResult> {
                let expected = <Self as Handler<($($ty,)*)>>::parameter_types().len();
                Box::pin(async move {
                    if args.len() != expected {
                        return Err(HandlerError::from(SignatureError::ArityMismatch {
                            expected,
                            got: args.len(),
                        }));
                    }

                    let mut args = args.into_iter();
                    $(
                        let $ty = match args.next().flatten() {
                            Some(value) => $ty::from_context(value)?,
                            None => {
                                return Err(HandlerError::from(ExtractError::Missing {
                                    expected: $ty::descriptor().name(),
                                }));
                            }
                        };
                    )*

                    (self)($($ty,)*).await.into_handler_result()
                })
            }
        }
    };
}

impl_handler!();
impl_handler!(T1);
impl_handler!(T1, T2);
impl_handler!(T1, T2, T3);
impl_handler!(T1, T2, T3, T4);
impl_handler!(T1, T2, T3, T4, T5);
impl_handler!(T1, T2, T3, T4, T5, T6);
impl_handler!(T1, T2, T3, T4, T5, T6, T7);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8);

// ============================================================================
// BoxedHandler - Type-erased handler stored in the registry
// ============================================================================

/// A type-erased handler that can be stored in collections.
pub type BoxedHandler = Arc<dyn ErasedHandler>;

/// Type-erased handler trait for dynamic dispatch.
pub trait ErasedHandler: Send + Sync {
    /// Execute the handler with arguments in declared order.
    fn call(&self, args: Vec<Option<ContextValue>>) -> BoxFuture<'static, HandlerResult>;

    /// The declared parameter types.
    fn parameter_types(&self) -> Vec<&'static TypeDescriptor>;

    /// A readable name for diagnostics, derived from the function's type.
    fn name(&self) -> &'static str;
}

/// Wraps a [`Handler`] so it can be stored as an [`ErasedHandler`].
pub struct HandlerFn<F, T> {
    f: F,
    _marker: PhantomData<fn() -> T>,
}

impl<F, T> HandlerFn<F, T> {
    pub fn new(f: F) -> Self {
        Self {
            f,
            _marker: PhantomData,
        }
    }
}

impl<F, T> ErasedHandler for HandlerFn<F, T>
where
    F: Handler<T>,
    T: 'static,
{
    fn call(&self, args: Vec<Option<ContextValue>>) -> BoxFuture<'static, HandlerResult> {
        self.f.clone().call(args)
    }

    fn parameter_types(&self) -> Vec<&'static TypeDescriptor> {
        F::parameter_types()
    }

    fn name(&self) -> &'static str {
        type_name::<F>()
    }
}

/// Convert a handler function into a boxed handler.
pub fn into_handler<F, T>(f: F) -> BoxedHandler
where
    F: Handler<T>,
    T: 'static,
{
    Arc::new(HandlerFn::new(f))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcb_core::types::{MESSAGE, SESSION, UPDATE};
    use mcb_core::{BoxedBot, Message, Update};
    use std::fmt;

    async fn no_params() {}

    async fn message_and_session(_message: Arc<Message>, _bot: BoxedBot) {}

    async fn reads_text(message: Arc<Message>) -> Result<(), HandlerError> {
        match message.text.as_deref() {
            Some("fail") => Err(HandlerError::failed("asked to fail")),
            _ => Ok(()),
        }
    }

    #[derive(Debug)]
    struct Boom;

    impl fmt::Display for Boom {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("boom")
        }
    }

    impl std::error::Error for Boom {}

    fn message(text: &str) -> Option<ContextValue> {
        Some(ContextValue::Message(Arc::new(Message::text(1, text))))
    }

    #[test]
    fn test_parameter_types() {
        assert!(into_handler(no_params).parameter_types().is_empty());
        assert_eq!(
            into_handler(message_and_session).parameter_types(),
            vec![&MESSAGE, &SESSION]
        );
    }

    #[test]
    fn test_name_mentions_function() {
        assert!(into_handler(no_params).name().ends_with("no_params"));
    }

    #[tokio::test]
    async fn test_call_with_declared_args() {
        let handler = into_handler(reads_text);
        tokio_test::assert_ok!(handler.call(vec![message("hello")]).await);

        let err = handler.call(vec![message("fail")]).await.unwrap_err();
        assert_eq!(err.to_string(), "asked to fail");
    }

    #[tokio::test]
    async fn test_custom_error_type() {
        let handler = into_handler(|| async { Err::<(), _>(Boom) });
        let err = handler.call(vec![]).await.unwrap_err();
        assert!(matches!(err, HandlerError::Failed { .. }));
        assert_eq!(err.to_string(), "boom");
    }

    #[tokio::test]
    async fn test_missing_argument() {
        let handler = into_handler(reads_text);
        let err = handler.call(vec![None]).await.unwrap_err();
        assert!(matches!(
            err,
            HandlerError::Extract(ExtractError::Missing { expected: "Message" })
        ));
    }

    #[tokio::test]
    async fn test_wrong_argument_type() {
        let handler = into_handler(reads_text);
        let update = Some(ContextValue::Update(Arc::new(Update::default())));
        let err = handler.call(vec![update]).await.unwrap_err();
        assert!(matches!(err, HandlerError::Extract(_)));
    }

    #[tokio::test]
    async fn test_wrong_arity() {
        let handler = into_handler(reads_text);
        let err = handler.call(vec![]).await.unwrap_err();
        assert!(matches!(
            err,
            HandlerError::Arity(SignatureError::ArityMismatch {
                expected: 1,
                got: 0
            })
        ));
    }

    #[tokio::test]
    async fn test_closure_captures_state() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);
        let handler = into_handler(move |_update: Arc<Update>| {
            let c = Arc::clone(&counter_clone);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        });

        assert_eq!(handler.parameter_types(), vec![&UPDATE]);
        let update = Some(ContextValue::Update(Arc::new(Update::default())));
        handler.call(vec![update.clone()]).await.unwrap();
        handler.call(vec![update]).await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }
}
