/// Gives a fieldless enum a fixed string form: `as_str`, `Display`, a
/// case-insensitive `FromStr` (accepting any `| "alias"`) and an `ALL` table in declaration order.
#[macro_export]
macro_rules! impl_str_enum {
    ($enum_name:ident, $( $variant:ident => $label:literal $( | $alias:literal )* ),+ $(,)?) => {
        impl $enum_name {
            pub const ALL: &'static [$enum_name] = &[$( $enum_name::$variant, )+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $( $enum_name::$variant => $label, )+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = $crate::error::ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim();
                $(
                    if wanted.eq_ignore_ascii_case($label)
                        $( || wanted.eq_ignore_ascii_case($alias) )*
                    {
                        return Ok($enum_name::$variant);
                    }
                )+
                Err($crate::error::ParseEnumError {
                    kind: stringify!($enum_name),
                    value: s.to_string(),
                })
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}
