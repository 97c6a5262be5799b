//! Logging shim.
//!
//! Embedded builds log through `defmt` (feature `defmt`), host builds
//! through `tracing` (feature `tracing`). With neither enabled the macros
//! expand to a borrow of their arguments and nothing else, so call sites in
//! the interrupt path cost nothing.
//!
//! Format strings must stay within the common subset: `{}` for integers and
//! `{:?}` for engine enums (which derive both `Debug` and `defmt::Format`).

#![allow(unused_macros)]

macro_rules! log_at {
    ($level:ident, $s:literal $(, $x:expr)* $(,)?) => {{
        #[cfg(feature = "defmt")]
        ::defmt::$level!($s $(, $x)*);
        #[cfg(all(feature = "tracing", not(feature = "defmt")))]
        ::tracing::$level!($s $(, $x)*);
        #[cfg(not(any(feature = "defmt", feature = "tracing")))]
        {
            let _ = ($(&$x),*);
        }
    }};
}

macro_rules! trace {
    ($($t:tt)*) => { $crate::logging::log_at!(trace, $($t)*) };
}

macro_rules! debug {
    ($($t:tt)*) => { $crate::logging::log_at!(debug, $($t)*) };
}

macro_rules! info {
    ($($t:tt)*) => { $crate::logging::log_at!(info, $($t)*) };
}

macro_rules! warning {
    ($($t:tt)*) => { $crate::logging::log_at!(warn, $($t)*) };
}

pub(crate) use {debug, info, log_at, trace, warning};
