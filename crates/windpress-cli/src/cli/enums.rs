use clap::ValueEnum;
use windpress_build::TailwindVersion;

/// Tailwind CSS major version
#[derive(Copy, Clone, PartialEq, Eq, Debug, ValueEnum)]
pub enum TailwindMajor {
    /// Tailwind CSS 3 with a JavaScript config
    #[value(name = "3")]
    V3,

    /// Tailwind CSS 4 with CSS-first configuration
    #[value(name = "4")]
    V4,
}

impl From<TailwindMajor> for TailwindVersion {
    fn from(major: TailwindMajor) -> Self {
        match major {
            TailwindMajor::V3 => TailwindVersion::V3,
            TailwindMajor::V4 => TailwindVersion::V4,
        }
    }
}

/// On-disk volume format
#[derive(Copy, Clone, PartialEq, Eq, Debug, ValueEnum)]
pub enum VolumeFormat {
    /// `.windpress` backup (compressed entry list)
    ///
    /// The format of the dashboard's export and import buttons.
    #[value(name = "backup")]
    Backup,

    /// Base64 `{path: content}` container
    ///
    /// The format the dashboard hands to the compiler.
    #[value(name = "container")]
    Container,
}
