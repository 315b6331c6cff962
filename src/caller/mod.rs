//! Caller-context logging.
//!
//! # Responsibilities
//! - Capture the calling function, file, line and argument values
//! - Merge them into the request field schema for manual log calls
//!
//! # Design Decisions
//! - Capture happens at the call site through macros: `function_name!()`
//!   and `caller_context!(args...)`, so it is resolved at compile time and
//!   cannot fail at runtime
//! - Arguments are named explicitly and rendered with `Debug`

pub mod context;
pub mod logger;

pub use context::{relative_path, short_function_name, CallerContext};
pub use logger::ExtraLogger;

/// Name of the enclosing function, without its module path.
///
/// Closure and async-block frames are skipped, so inside an `async fn`
/// handler this is the handler's name.
#[macro_export]
macro_rules! function_name {
    () => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        $crate::caller::short_function_name(type_name_of(f))
    }};
}

/// [`CallerContext`] for the current call site, recording the listed
/// arguments by name.
///
/// ```ignore
/// async fn create_item(body: Item, limit: u32) {
///     logger.info(&caller_context!(body, limit), "creating", None);
/// }
/// ```
#[macro_export]
macro_rules! caller_context {
    ($($arg:ident),* $(,)?) => {
        $crate::caller::CallerContext::new($crate::function_name!(), ::std::file!(), ::std::line!())
            $(.with_argument(::std::stringify!($arg), &$arg))*
    };
}
