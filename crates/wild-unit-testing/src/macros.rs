//! Call-site macros.
//!
//! These forward to the free functions in [`crate::assertions`], supplying
//! the source text of the checked expressions via `stringify!`.

/// Record a passing check on the global recorder.
#[macro_export]
macro_rules! pass {
    () => {
        $crate::pass()
    };
}

/// Record a failing check on the global recorder.
///
/// ```ignore
/// fail!("unreachable branch taken");
/// ```
#[macro_export]
macro_rules! fail {
    ($detail:expr) => {
        $crate::fail(::core::convert::AsRef::<str>::as_ref(&$detail))
    };
}

/// Check that an expression is `true`.
///
/// With a second argument the detail string is taken verbatim instead of
/// being derived from the expression text.
#[macro_export]
macro_rules! assert_true {
    ($value:expr $(,)?) => {
        $crate::assert_true($value, ::core::stringify!($value))
    };
    ($value:expr, $detail:expr $(,)?) => {
        $crate::global_recorder().assert(
            $value,
            &$crate::SourceLocation::new(::core::file!(), ::core::line!()),
            ::core::convert::AsRef::<str>::as_ref(&$detail),
        )
    };
}

/// Check that an expression is `false`.
#[macro_export]
macro_rules! assert_false {
    ($value:expr $(,)?) => {
        $crate::assert_false($value, ::core::stringify!($value))
    };
}

/// Check that two expressions compare equal.
#[macro_export]
macro_rules! assert_equals {
    ($x:expr, $y:expr $(,)?) => {
        $crate::assert_equals(
            &$x,
            &$y,
            ::core::stringify!($x),
            ::core::stringify!($y),
        )
    };
}

/// Check that a block panics with a payload of the given type.
///
/// ```ignore
/// assert_throws!(parse_port("http"), PortError);
/// ```
#[macro_export]
macro_rules! assert_throws {
    ($code:expr, $payload:ty $(,)?) => {
        $crate::assert_throws::<$payload, _>(|| {
            let _ = $code;
        })
    };
}

/// Check the exact text a block writes to standard output.
#[macro_export]
macro_rules! assert_prints {
    ($code:expr, $expected:expr $(,)?) => {
        $crate::assert_prints(
            || {
                let _ = $code;
            },
            ::core::convert::AsRef::<str>::as_ref(&$expected),
        )
    };
}

/// Check the exact text a block writes to standard error.
#[macro_export]
macro_rules! assert_prints_to_stderr {
    ($code:expr, $expected:expr $(,)?) => {
        $crate::assert_prints_to_stderr(
            || {
                let _ = $code;
            },
            ::core::convert::AsRef::<str>::as_ref(&$expected),
        )
    };
}

/// Write the global summary line and return the failure count from `main`.
///
/// Use in a `main` returning [`std::process::ExitCode`].
#[macro_export]
macro_rules! end_test {
    () => {
        return $crate::finish()
    };
}
