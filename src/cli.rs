use clap::Parser;
use std::ffi::OsString;
use std::path::PathBuf;

/// Commit dialog for an svn working copy.
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(name = "svn-commit-tui", version, about)]
pub struct Cli {
    /// Show unversioned files regardless of the saved toggle.
    #[arg(long)]
    pub show_unversioned: bool,

    /// svn binary to run instead of the configured one.
    #[arg(long, value_name = "BIN")]
    pub svn: Option<String>,

    /// Working-copy roots to watch.
    #[arg(value_name = "PATH")]
    pub roots: Vec<PathBuf>,
}

/// Flags clap should see; anything else starting with `-` is dropped.
const KNOWN_FLAGS: [(&str, bool); 6] = [
    ("--show-unversioned", false),
    ("--svn", true),
    ("--help", false),
    ("-h", false),
    ("--version", false),
    ("-V", false),
];

impl Cli {
    pub fn parse_lenient<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        Self::parse_from(retain_known_flags(args))
    }
}

/// Keeps the program name, positional paths and recognized flags (with their
/// value when they take one). Everything after `--` is positional.
pub fn retain_known_flags<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut iter = args.into_iter().map(Into::<OsString>::into);
    let mut kept: Vec<OsString> = iter.next().into_iter().collect();

    while let Some(arg) = iter.next() {
        let text = arg.to_string_lossy().into_owned();
        if text == "--" {
            kept.push(arg);
            kept.extend(iter.by_ref());
            break;
        }
        if !text.starts_with('-') || text == "-" {
            kept.push(arg);
            continue;
        }

        let name = text.split_once('=').map_or(text.as_str(), |(name, _)| name);
        let Some((_, takes_value)) = KNOWN_FLAGS.iter().find(|(flag, _)| *flag == name) else {
            continue;
        };
        let inline_value = text.contains('=');
        kept.push(arg);
        if *takes_value
            && !inline_value
            && let Some(value) = iter.next()
        {
            kept.push(value);
        }
    }

    kept
}
