/// Declares a config section whose fields fall back to their declared defaults,
/// both through `Default` and when the field is missing from `config.json`.
#[macro_export]
macro_rules! config_section {
    (
        $(#[$struct_meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $type:ty $(= $default:expr)?
            ),* $(,)?
        }
    ) => {
        $(#[$struct_meta])*
        #[derive(serde::Serialize, serde::Deserialize)]
        #[serde(default)]
        $vis struct $name {
            $(
                $(#[$field_meta])*
                $field_vis $field: $type
            ),*
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    $(
                        $field: $crate::config_section!(@default $($default)?)
                    ),*
                }
            }
        }
    };
    (@default) => {
        Default::default()
    };
    (@default $expr:expr) => {
        $expr
    };
}

/// Minecraft player names compare case-insensitively.
pub fn same_identity(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// Longest name the game accepts.
const MAX_IDENTITY_LEN: usize = 16;

/// Accepts only what the game allows in a player name: 1 to 16 ASCII letters,
/// digits or underscores. Selectors like `@a` and path fragments never pass.
pub fn valid_identity(identity: &str) -> bool {
    (1..=MAX_IDENTITY_LEN).contains(&identity.len())
        && identity
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}
