// Thin logging shims. With the `defmt` feature the macros forward to defmt;
// without it the arguments are only borrowed so call sites stay warning-free.

#[cfg(feature = "defmt")]
macro_rules! log_info {
    ($($arg:tt)*) => { ::defmt::info!($($arg)*) };
}

#[cfg(not(feature = "defmt"))]
macro_rules! log_info {
    ($fmt:literal $(,)?) => {{}};
    ($fmt:literal, $($arg:expr),+ $(,)?) => {{ let _ = ($(&$arg,)+); }};
}

#[cfg(feature = "defmt")]
macro_rules! log_warn {
    ($($arg:tt)*) => { ::defmt::warn!($($arg)*) };
}

#[cfg(not(feature = "defmt"))]
macro_rules! log_warn {
    ($fmt:literal $(,)?) => {{}};
    ($fmt:literal, $($arg:expr),+ $(,)?) => {{ let _ = ($(&$arg,)+); }};
}

#[cfg(feature = "defmt")]
macro_rules! log_debug {
    ($($arg:tt)*) => { ::defmt::debug!($($arg)*) };
}

#[cfg(not(feature = "defmt"))]
macro_rules! log_debug {
    ($fmt:literal $(,)?) => {{}};
    ($fmt:literal, $($arg:expr),+ $(,)?) => {{ let _ = ($(&$arg,)+); }};
}
