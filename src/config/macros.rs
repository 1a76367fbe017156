/// Configuration macros for zero-repetition config definitions
///
/// `config_struct!` defines a configuration structure with its defaults in
/// a single declaration and generates:
/// - The struct with public fields
/// - The Default implementation
/// - Serde serialization/deserialization with `#[serde(default)]`, so a
///   partial TOML file only overrides the fields it names
///
/// # Example
/// ```
/// wshub::config_struct! {
///     pub struct LimitsConfig {
///         max_rooms: usize = 1024,
///         enabled: bool = true,
///     }
/// }
///
/// let limits = LimitsConfig::default();
/// assert_eq!(limits.max_rooms, 1024);
/// ```
#[macro_export]
macro_rules! config_struct {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_name:ident: $field_type:ty = $default_value:expr
            ),*
            $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
        #[serde(default)]
        $vis struct $name {
            $(
                $(#[$field_meta])*
                pub $field_name: $field_type,
            )*
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    $(
                        $field_name: $default_value,
                    )*
                }
            }
        }
    };
}
