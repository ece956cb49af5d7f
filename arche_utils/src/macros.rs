//! Logging macros.

/// Evaluates the given expression and logs the time it took at the `info`
/// level.
#[macro_export]
macro_rules! with_timing_info_logging {
    ($message:expr $(,$arg:expr)*; $expression:expr) => {{
        let _start_time = ::std::time::Instant::now();
        let _result = $expression;
        let _duration = _start_time.elapsed();
        $crate::log::info!(
            concat!($message, " took {:.2} ms")$(,$arg)*,
            _duration.as_secs_f64() * 1e3,
        );
        _result
    }};
}

/// Evaluates the given expression between `trace` level "Begin" and "Done"
/// messages, the latter including the elapsed time.
#[macro_export]
macro_rules! with_trace_logging {
    ($message:expr $(,$arg:expr)*; $expression:expr) => {{
        $crate::log::trace!(concat!("Begin: ", $message)$(,$arg)*);
        let _start_time = ::std::time::Instant::now();
        let _result = $expression;
        let _duration = _start_time.elapsed();
        $crate::log::trace!(
            concat!("Done: ", $message, " ({:.2} ms)")$(,$arg)*,
            _duration.as_secs_f64() * 1e3
        );
        _result
    }};
}

#[cfg(test)]
mod test {
    #[test]
    fn logging_macros_return_value_of_expression() {
        let sum = with_trace_logging!("Summing {} values", 3; 1 + 2 + 3);
        assert_eq!(sum, 6);

        let product = with_timing_info_logging!("Multiplying"; 2 * 21);
        assert_eq!(product, 42);
    }
}
