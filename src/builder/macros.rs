//! Macros for ergonomic parameter construction.

/// Build a [`Params`](crate::core::Params) bag from `key => value` pairs.
///
/// Values are converted with `Into<ParamValue>`, so plain literals, strings,
/// mode identifiers and `serde_json::Value`s can be mixed.
///
/// # Example
///
/// ```
/// use modeset::params;
/// use modeset::core::ModeId;
///
/// let params = params! {
///     "speed" => 5,
///     "sprint" => true,
///     "target" => ModeId(2),
/// };
///
/// assert_eq!(params.get_int("speed"), Some(5));
/// assert_eq!(params.get_mode("target"), Some(ModeId(2)));
/// ```
#[macro_export]
macro_rules! params {
    () => {
        $crate::core::Params::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut params = $crate::core::Params::new();
        $(
            params.insert($key, $value);
        )+
        params
    }};
}
