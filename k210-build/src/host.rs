/// The operating system the build is running on.
///
/// Only the distinctions that change how tools are invoked are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostOs {
    Windows,
    MacOs,
    /// Linux and every other Unix flavour.
    Other,
}

impl HostOs {
    /// The host this binary was compiled for.
    pub fn current() -> Self {
        if cfg!(windows) {
            HostOs::Windows
        } else if cfg!(target_os = "macos") {
            HostOs::MacOs
        } else {
            HostOs::Other
        }
    }
}
