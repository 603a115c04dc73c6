/// Checks a precondition of the host API. A failed check is a programming
/// error on the host side, never a recoverable condition.
macro_rules! api_check {
    ($cond:expr, $($msg:tt)+) => {
        if !$cond {
            panic!("api check failed: {}", format_args!($($msg)+));
        }
    };
}
