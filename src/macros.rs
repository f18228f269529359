/// Declares a verb enum together with its dispatch table. Doc comments on the variants double
/// as the one-line help text.
macro_rules! verbs {
    ($(#[$attr:meta])* $vis:vis enum $n:ident {
        $($(#[doc = $doc:literal])* $v:ident => $s:literal,)*
    }) => {
        $(#[$attr])*
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        $vis enum $n {
            $($(#[doc = $doc])* $v,)*
        }

        impl $n {
            pub const ALL: &'static [$n] = &[$($n::$v,)*];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($n::$v => $s,)*
                }
            }

            pub fn help(self) -> &'static str {
                match self {
                    $($n::$v => concat!($($doc,)*).trim(),)*
                }
            }

            pub fn lookup(verb: &str) -> Option<Self> {
                ::lazy_static::lazy_static! {
                    static ref TABLE: ::std::collections::HashMap<&'static str, $n> =
                        $n::ALL.iter().map(|&v| (v.as_str(), v)).collect();
                }
                TABLE.get(verb).copied()
            }

            /// Renders `verb  help` lines for every verb.
            pub fn render_help() -> String {
                let mut r = String::new();
                for v in Self::ALL {
                    r += &format!("  {:<14}{}\n", v.as_str(), v.help());
                }
                r
            }
        }
    };
}
