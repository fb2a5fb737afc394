/// A single command argument, convertible from the primitive types an
/// administrative command needs to pass (node ids, slots, counts, ...).
///
/// Grounded on the teacher's `CommandArg`/`IntoArgs` building blocks
/// (`src/resp/command_arg.rs`, `src/resp/into_args.rs`), trimmed to the
/// handful of conversions this crate actually needs.
#[derive(Debug, Clone)]
pub struct Arg(pub(crate) Vec<u8>);

impl From<&str> for Arg {
    fn from(s: &str) -> Self {
        Arg(s.as_bytes().to_vec())
    }
}

impl From<String> for Arg {
    fn from(s: String) -> Self {
        Arg(s.into_bytes())
    }
}

impl From<&String> for Arg {
    fn from(s: &String) -> Self {
        Arg(s.as_bytes().to_vec())
    }
}

macro_rules! impl_arg_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Arg {
                fn from(i: $t) -> Self {
                    Arg(i.to_string().into_bytes())
                }
            }
        )*
    };
}

impl_arg_from_int!(u8, u16, u32, u64, i8, i16, i32, i64, usize);

/// An ordered list of [`Arg`]s making up one command, the first of which is
/// the command name (and the one the rename table rewrites).
#[derive(Debug, Clone, Default)]
pub struct Args(pub(crate) Vec<Arg>);

impl Args {
    pub fn new() -> Self {
        Args(Vec::new())
    }

    #[must_use]
    pub fn arg(mut self, a: impl Into<Arg>) -> Self {
        self.0.push(a.into());
        self
    }

    #[must_use]
    pub fn args<I, A>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        self.0.extend(items.into_iter().map(Into::into));
        self
    }

    pub fn name(&self) -> &[u8] {
        self.0.first().map(|a| a.0.as_slice()).unwrap_or(&[])
    }
}

/// Shortcut matching the teacher's `cmd(name)` free function.
pub fn cmd(name: &str) -> Args {
    Args::new().arg(name)
}
