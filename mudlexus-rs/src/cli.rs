//! Command-line argument parsing.
//!
//! Usage:
//!   mudlexus [-f[<file>]] [-L<dir>] [-r] [-c<lua>] [-d[d]] [<script.lua> ...]
//!   mudlexus -x<package.xml|package.nxs> [-o] <target-dir>
//!   mudlexus -k<dir> [<name>]

use std::path::PathBuf;

/// Usage summary printed on argument errors.
pub const USAGE: &str = "\
Usage: mudlexus [-f[<file>]] [-L<dir>] [-r] [-c<lua>] [-d[d]] [<script.lua> ...]
       mudlexus -x<package.xml|package.nxs> [-o] <target-dir>
       mudlexus -k<dir> [<name>]";

// ── Public types ──────────────────────────────────────────────────────────────

/// Parsed command-line arguments.
#[derive(Debug, Default)]
pub struct CliArgs {
    /// Run scripts (default) or convert a package.
    pub mode: Mode,
    /// `-o`: replace an existing extraction target.
    pub overwrite: bool,
    /// Which host setup file to load.
    pub config: ConfigFile,
    /// Where to fetch the translation layer from.
    pub source: AssetSource,
    /// Lua chunk to execute after bootstrap (`-c<lua>`).
    pub command: Option<String>,
    /// Number of `-d` flags: 1 = info, 2+ = debug.
    pub verbosity: u8,
    /// Lua scripts to run, in order, after `-c`.
    pub scripts: Vec<PathBuf>,
}

/// What the binary does.
#[derive(Debug, Default, PartialEq, Eq)]
pub enum Mode {
    /// Bootstrap the layer and run `-c` and scripts (default).
    #[default]
    Run,
    /// `-x<package> <target>`: extract a Mudlet or Nexus package.
    Extract { package: PathBuf, target: PathBuf },
    /// `-k<dir> [<name>]`: compile a tree into `{name}.nxs`.
    Compile { source: PathBuf, name: Option<String> },
}

/// How to choose the host setup file.
#[derive(Debug, Default)]
pub enum ConfigFile {
    /// Search the standard locations (default).
    #[default]
    Search,
    /// `-f` with no file argument: no setup file.
    Skip,
    /// `-f<file>`: load this specific file.
    Explicit(PathBuf),
}

/// Where the bootstrap fetches the translation layer.
#[derive(Debug, Default, PartialEq, Eq)]
pub enum AssetSource {
    /// The copy compiled into the binary (default).
    #[default]
    Embedded,
    /// `-L<dir>`: a local `{dir}/{version}/{asset}` mirror.
    Dir(PathBuf),
    /// `-r`: the published URL.
    Remote,
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parse `std::env::args()` and return [`CliArgs`] or an error message.
pub fn parse_args() -> Result<CliArgs, String> {
    let raw: Vec<String> = std::env::args().collect();
    parse_argv(raw.get(1..).unwrap_or_default())
}

/// Parse a slice of argument strings (exposed for testing).
pub fn parse_argv(argv: &[String]) -> Result<CliArgs, String> {
    let mut args = CliArgs::default();
    let mut i = 0;

    while i < argv.len() {
        let arg = argv[i].as_str();

        // `--` ends flag processing.
        if arg == "--" {
            args.scripts.extend(argv[i + 1..].iter().map(PathBuf::from));
            break;
        }

        if !arg.starts_with('-') || arg == "-" {
            args.scripts.push(PathBuf::from(arg));
            i += 1;
            continue;
        }

        let chars: Vec<char> = arg[1..].chars().collect();
        let mut j = 0;
        while j < chars.len() {
            match chars[j] {
                'd' => args.verbosity = args.verbosity.saturating_add(1),
                'r' => args.source = AssetSource::Remote,
                'o' => args.overwrite = true,

                // -f[<file>]
                'f' => {
                    if j + 1 < chars.len() {
                        let file: String = chars[j + 1..].iter().collect();
                        args.config = ConfigFile::Explicit(PathBuf::from(file));
                        j = chars.len();
                    } else if i + 1 < argv.len() && !argv[i + 1].starts_with('-') {
                        i += 1;
                        args.config = ConfigFile::Explicit(PathBuf::from(&argv[i]));
                    } else {
                        args.config = ConfigFile::Skip;
                    }
                }

                // -c<lua>
                'c' => {
                    let cmd = if j + 1 < chars.len() {
                        let s: String = chars[j + 1..].iter().collect();
                        j = chars.len();
                        s
                    } else if i + 1 < argv.len() {
                        i += 1;
                        argv[i].clone()
                    } else {
                        return Err("-c requires a Lua chunk argument".to_owned());
                    };
                    args.command = Some(cmd);
                }

                // -L<dir>
                'L' => {
                    let dir = if j + 1 < chars.len() {
                        let s: String = chars[j + 1..].iter().collect();
                        j = chars.len();
                        s
                    } else if i + 1 < argv.len() {
                        i += 1;
                        argv[i].clone()
                    } else {
                        return Err("-L requires a directory argument".to_owned());
                    };
                    args.source = AssetSource::Dir(PathBuf::from(dir));
                }

                // -x<package> / -k<dir>
                flag @ ('x' | 'k') => {
                    let path = if j + 1 < chars.len() {
                        let s: String = chars[j + 1..].iter().collect();
                        j = chars.len();
                        s
                    } else if i + 1 < argv.len() {
                        i += 1;
                        argv[i].clone()
                    } else if flag == 'x' {
                        return Err("-x requires a package file argument".to_owned());
                    } else {
                        return Err("-k requires a directory argument".to_owned());
                    };
                    if args.mode != Mode::Run {
                        return Err("-x and -k are mutually exclusive".to_owned());
                    }
                    args.mode = match flag {
                        'x' => Mode::Extract { package: PathBuf::from(path), target: PathBuf::new() },
                        _ => Mode::Compile { source: PathBuf::from(path), name: None },
                    };
                }

                c => return Err(format!("unknown option: -{c}")),
            }
            j += 1;
        }
        i += 1;
    }

    // Package modes take their positionals from the script list.
    match &mut args.mode {
        Mode::Run => {}
        Mode::Extract { target, .. } => {
            let [dir] = <[PathBuf; 1]>::try_from(std::mem::take(&mut args.scripts))
                .map_err(|_| "-x requires exactly one target directory".to_owned())?;
            *target = dir;
        }
        Mode::Compile { name, .. } => {
            let mut rest = std::mem::take(&mut args.scripts).into_iter();
            *name = rest.next().map(|p| p.to_string_lossy().into_owned());
            if rest.next().is_some() {
                return Err("-k takes at most one package name".to_owned());
            }
        }
    }
    if args.mode != Mode::Run && args.command.is_some() {
        return Err("-c cannot be combined with -x or -k".to_owned());
    }

    Ok(args)
}

// ── Path helpers ──────────────────────────────────────────────────────────────

/// Search for the host setup file in the standard locations.
///
/// Order: `~/.mudlexusrc`, the platform config dir's `mudlexusrc`
/// (`~/.config/mudlexus/mudlexusrc` on Linux), `./.mudlexusrc`.
pub fn find_user_config() -> Option<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(base) = directories::BaseDirs::new() {
        candidates.push(base.home_dir().join(".mudlexusrc"));
    }
    if let Some(proj) = directories::ProjectDirs::from("", "", "mudlexus") {
        candidates.push(proj.config_dir().join("mudlexusrc"));
    }
    candidates.push(PathBuf::from("./.mudlexusrc"));
    candidates.into_iter().find(|p| p.exists())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|&s| s.to_owned()).collect()
    }

    #[test]
    fn empty_args() {
        let a = parse_argv(&argv(&[])).unwrap();
        assert!(matches!(a.config, ConfigFile::Search));
        assert_eq!(a.source, AssetSource::Embedded);
        assert_eq!(a.verbosity, 0);
        assert!(a.scripts.is_empty());
        assert_eq!(a.mode, Mode::Run);
    }

    #[test]
    fn scripts_positional() {
        let a = parse_argv(&argv(&["a.lua", "b.lua"])).unwrap();
        assert_eq!(a.scripts, vec![PathBuf::from("a.lua"), PathBuf::from("b.lua")]);
    }

    #[test]
    fn double_dash_ends_flags() {
        let a = parse_argv(&argv(&["--", "-weird.lua"])).unwrap();
        assert_eq!(a.scripts, vec![PathBuf::from("-weird.lua")]);
    }

    #[test]
    fn verbosity_counts() {
        assert_eq!(parse_argv(&argv(&["-d"])).unwrap().verbosity, 1);
        assert_eq!(parse_argv(&argv(&["-dd"])).unwrap().verbosity, 2);
        assert_eq!(parse_argv(&argv(&["-d", "-d", "-d"])).unwrap().verbosity, 3);
    }

    #[test]
    fn remote_flag() {
        let a = parse_argv(&argv(&["-r"])).unwrap();
        assert_eq!(a.source, AssetSource::Remote);
    }

    #[test]
    fn asset_dir_embedded() {
        let a = parse_argv(&argv(&["-L/srv/mudlexus"])).unwrap();
        assert_eq!(a.source, AssetSource::Dir(PathBuf::from("/srv/mudlexus")));
    }

    #[test]
    fn asset_dir_separate() {
        let a = parse_argv(&argv(&["-L", "/srv/mudlexus"])).unwrap();
        assert_eq!(a.source, AssetSource::Dir(PathBuf::from("/srv/mudlexus")));
    }

    #[test]
    fn config_skip() {
        let a = parse_argv(&argv(&["-f"])).unwrap();
        assert!(matches!(a.config, ConfigFile::Skip));
    }

    #[test]
    fn config_explicit_embedded() {
        let a = parse_argv(&argv(&["-fhost.rc"])).unwrap();
        assert!(matches!(&a.config, ConfigFile::Explicit(p) if p == &PathBuf::from("host.rc")));
    }

    #[test]
    fn config_explicit_separate() {
        let a = parse_argv(&argv(&["-f", "host.rc", "go.lua"])).unwrap();
        assert!(matches!(&a.config, ConfigFile::Explicit(p) if p == &PathBuf::from("host.rc")));
        assert_eq!(a.scripts, vec![PathBuf::from("go.lua")]);
    }

    #[test]
    fn command_embedded_and_separate() {
        let a = parse_argv(&argv(&["-csend('look')"])).unwrap();
        assert_eq!(a.command.as_deref(), Some("send('look')"));
        let b = parse_argv(&argv(&["-c", "echo('hi')"])).unwrap();
        assert_eq!(b.command.as_deref(), Some("echo('hi')"));
    }

    #[test]
    fn combined_flags() {
        let a = parse_argv(&argv(&["-drf"])).unwrap();
        assert_eq!(a.verbosity, 1);
        assert_eq!(a.source, AssetSource::Remote);
        assert!(matches!(a.config, ConfigFile::Skip));
    }

    #[test]
    fn missing_values_are_errors() {
        assert!(parse_argv(&argv(&["-c"])).is_err());
        assert!(parse_argv(&argv(&["-L"])).is_err());
    }

    #[test]
    fn extract_mode() {
        let a = parse_argv(&argv(&["-xcombat.xml", "-o", "combat"])).unwrap();
        assert_eq!(
            a.mode,
            Mode::Extract { package: PathBuf::from("combat.xml"), target: PathBuf::from("combat") }
        );
        assert!(a.overwrite);

        let b = parse_argv(&argv(&["-x", "combat.nxs", "out"])).unwrap();
        assert!(matches!(b.mode, Mode::Extract { ref package, .. } if package == &PathBuf::from("combat.nxs")));
        assert!(!b.overwrite);
    }

    #[test]
    fn extract_needs_one_target() {
        assert!(parse_argv(&argv(&["-xcombat.xml"])).is_err());
        assert!(parse_argv(&argv(&["-xcombat.xml", "a", "b"])).is_err());
        assert!(parse_argv(&argv(&["-x"])).is_err());
    }

    #[test]
    fn compile_mode() {
        let a = parse_argv(&argv(&["-kcombat"])).unwrap();
        assert_eq!(a.mode, Mode::Compile { source: PathBuf::from("combat"), name: None });

        let b = parse_argv(&argv(&["-k", "combat", "warrior"])).unwrap();
        assert_eq!(
            b.mode,
            Mode::Compile { source: PathBuf::from("combat"), name: Some("warrior".to_owned()) }
        );
        assert!(parse_argv(&argv(&["-kcombat", "a", "b"])).is_err());
    }

    #[test]
    fn package_modes_exclude_each_other_and_chunks() {
        assert!(parse_argv(&argv(&["-xa.xml", "-kdir", "out"])).is_err());
        assert!(parse_argv(&argv(&["-xa.xml", "-csend('x')", "out"])).is_err());
    }

    #[test]
    fn unknown_flag() {
        assert_eq!(parse_argv(&argv(&["-z"])).unwrap_err(), "unknown option: -z");
    }
}
