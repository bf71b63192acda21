//! Logging macro implementations
//!
//! The service logs through `defmt` on embedded targets and `log` on std
//! hosts, selected by feature. With neither feature enabled the macros
//! evaluate their arguments and emit nothing.

// On no_std (embedded) targets, defmt and log are mutually exclusive to avoid double logging
#[cfg(all(feature = "log", feature = "defmt", target_os = "none"))]
compile_error!("features `log` and `defmt` are mutually exclusive on no_std targets");

#[cfg(feature = "defmt")]
mod defmt {
    /// Logs a trace message using the underlying logger
    #[macro_export]
    #[collapse_debuginfo(yes)]
    macro_rules! trace {
        ($s:literal $(, $x:expr)* $(,)?) => {
            {
                let _ = ($s, $( &$x ),*);
                ::defmt::trace!($s $(, $x)*);
            }
        };
    }

    /// Logs a debug message using the underlying logger
    #[macro_export]
    #[collapse_debuginfo(yes)]
    macro_rules! debug {
        ($s:literal $(, $x:expr)* $(,)?) => {
            {
                let _ = ($s, $( &$x ),*);
                ::defmt::debug!($s $(, $x)*);
            }
        };
    }

    /// Logs an info message using the underlying logger
    #[macro_export]
    #[collapse_debuginfo(yes)]
    macro_rules! info {
        ($s:literal $(, $x:expr)* $(,)?) => {
            {
                let _ = ($s, $( &$x ),*);
                ::defmt::info!($s $(, $x)*);
            }
        };
    }

    /// Logs a warning using the underlying logger
    #[macro_export]
    #[collapse_debuginfo(yes)]
    macro_rules! warn {
        ($s:literal $(, $x:expr)* $(,)?) => {
            {
                let _ = ($s, $( &$x ),*);
                ::defmt::warn!($s $(, $x)*);
            }
        };
    }

    /// Logs an error using the underlying logger
    #[macro_export]
    #[collapse_debuginfo(yes)]
    macro_rules! error {
        ($s:literal $(, $x:expr)* $(,)?) => {
            {
                let _ = ($s, $( &$x ),*);
                ::defmt::error!($s $(, $x)*);
            }
        };
    }
}

#[cfg(all(feature = "log", not(feature = "defmt")))]
mod log {
    /// Logs a trace message using the underlying logger
    #[macro_export]
    #[collapse_debuginfo(yes)]
    macro_rules! trace {
        ($s:literal $(, $x:expr)* $(,)?) => {
            {
                ::log::trace!($s $(, $x)*);
            }
        };
    }

    /// Logs a debug message using the underlying logger
    #[macro_export]
    #[collapse_debuginfo(yes)]
    macro_rules! debug {
        ($s:literal $(, $x:expr)* $(,)?) => {
            {
                ::log::debug!($s $(, $x)*);
            }
        };
    }

    /// Logs an info message using the underlying logger
    #[macro_export]
    #[collapse_debuginfo(yes)]
    macro_rules! info {
        ($s:literal $(, $x:expr)* $(,)?) => {
            {
                ::log::info!($s $(, $x)*);
            }
        };
    }

    /// Logs a warning using the underlying logger
    #[macro_export]
    #[collapse_debuginfo(yes)]
    macro_rules! warn {
        ($s:literal $(, $x:expr)* $(,)?) => {
            {
                ::log::warn!($s $(, $x)*);
            }
        };
    }

    /// Logs an error using the underlying logger
    #[macro_export]
    #[collapse_debuginfo(yes)]
    macro_rules! error {
        ($s:literal $(, $x:expr)* $(,)?) => {
            {
                ::log::error!($s $(, $x)*);
            }
        };
    }
}

#[cfg(not(any(feature = "defmt", feature = "log")))]
mod none {
    /// Logs a trace message using the underlying logger
    #[macro_export]
    #[collapse_debuginfo(yes)]
    macro_rules! trace {
        ($s:literal $(, $x:expr)* $(,)?) => {
            {
                let _ = ($s, $( &$x ),*);
            }
        };
    }

    /// Logs a debug message using the underlying logger
    #[macro_export]
    #[collapse_debuginfo(yes)]
    macro_rules! debug {
        ($s:literal $(, $x:expr)* $(,)?) => {
            {
                let _ = ($s, $( &$x ),*);
            }
        };
    }

    /// Logs an info message using the underlying logger
    #[macro_export]
    #[collapse_debuginfo(yes)]
    macro_rules! info {
        ($s:literal $(, $x:expr)* $(,)?) => {
            {
                let _ = ($s, $( &$x ),*);
            }
        };
    }

    /// Logs a warning using the underlying logger
    #[macro_export]
    #[collapse_debuginfo(yes)]
    macro_rules! warn {
        ($s:literal $(, $x:expr)* $(,)?) => {
            {
                let _ = ($s, $( &$x ),*);
            }
        };
    }

    /// Logs an error using the underlying logger
    #[macro_export]
    #[collapse_debuginfo(yes)]
    macro_rules! error {
        ($s:literal $(, $x:expr)* $(,)?) => {
            {
                let _ = ($s, $( &$x ),*);
            }
        };
    }
}
