//! Command-line argument parsing.
//!
//! Usage:
//!   gamexpr [-f[<file>]] [-D<name>=<value>]... [-p<digits>] [-r<seed>] [-stmd] [<text>...]
//!
//! Words that look like negative numbers (`-3+5`) are input, not flags; `--`
//! ends flag processing for anything else that starts with `-`.

use std::path::PathBuf;

use directories::ProjectDirs;

// ── Public types ──────────────────────────────────────────────────────────────

/// Parsed command-line arguments.
#[derive(Debug, Default)]
pub struct CliArgs {
    /// Settings-file specification.
    pub config: ConfigFile,
    /// Variables from `-D<name>=<value>`, in command-line order.
    pub defines: Vec<(String, String)>,
    /// Precision override (`-p<digits>`).
    pub precision: Option<u32>,
    /// Seed for random selection (`-r<seed>`).
    pub seed: Option<u64>,
    /// Fail on operand kind mismatches (`-s`).
    pub strict: bool,
    /// How each input is processed.
    pub mode: Mode,
    /// Debug logging (`-d`).
    pub debug: bool,
    /// Positional words joined with spaces, if any were given.
    pub input: Option<String>,
}

/// How to choose the settings file.
#[derive(Debug, Default, PartialEq, Eq)]
pub enum ConfigFile {
    /// Search the platform config directory, then `./.gamexprrc` (default).
    #[default]
    Search,
    /// `-f` with no file argument: load no settings.
    Skip,
    /// `-f<file>`: load this specific file.
    Explicit(PathBuf),
}

/// What to do with each input.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Evaluate as a bare expression (default).
    #[default]
    Expression,
    /// Expand `{...}` and `[...]` directives (`-t`).
    Template,
    /// Plain `{key}` substitution with markup (`-m`).
    Format,
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parse `std::env::args()` and return [`CliArgs`] or an error message.
pub fn parse_args() -> Result<CliArgs, String> {
    let raw: Vec<String> = std::env::args().collect();
    parse_argv(raw.get(1..).unwrap_or_default())
}

/// Take the value of a flag that requires one: the rest of this argument, or
/// the next argument.
fn flag_value(
    flag: char,
    chars: &[char],
    j: &mut usize,
    argv: &[String],
    i: &mut usize,
) -> Result<String, String> {
    if *j + 1 < chars.len() {
        let s: String = chars[*j + 1..].iter().collect();
        *j = chars.len();
        Ok(s)
    } else if *i + 1 < argv.len() {
        *i += 1;
        Ok(argv[*i].clone())
    } else {
        Err(format!("-{flag} requires an argument"))
    }
}

fn looks_numeric(arg: &str) -> bool {
    arg.strip_prefix('-')
        .is_some_and(|rest| rest.starts_with(|c: char| c.is_ascii_digit() || c == '.'))
}

/// Parse a slice of argument strings (exposed for testing).
pub fn parse_argv(argv: &[String]) -> Result<CliArgs, String> {
    let mut args = CliArgs::default();
    let mut positional: Vec<String> = Vec::new();
    let mut i = 0;

    while i < argv.len() {
        let arg = argv[i].as_str();

        // `--` ends flag processing.
        if arg == "--" {
            i += 1;
            positional.extend(argv[i..].iter().cloned());
            break;
        }

        // Non-flag argument.
        if !arg.starts_with('-') || arg == "-" || looks_numeric(arg) {
            positional.push(arg.to_owned());
            i += 1;
            continue;
        }

        // Flag argument: iterate over characters after the leading `-`.
        let chars: Vec<char> = arg[1..].chars().collect();
        let mut j = 0;
        while j < chars.len() {
            match chars[j] {
                'd' => args.debug = true,
                's' => args.strict = true,
                't' => args.mode = Mode::Template,
                'm' => args.mode = Mode::Format,

                // -f[<file>]: the file must be attached.
                'f' => {
                    if j + 1 < chars.len() {
                        let file: String = chars[j + 1..].iter().collect();
                        args.config = ConfigFile::Explicit(PathBuf::from(file));
                        j = chars.len();
                    } else {
                        args.config = ConfigFile::Skip;
                    }
                }

                // -D<name>=<value>
                'D' => {
                    let def = flag_value('D', &chars, &mut j, argv, &mut i)?;
                    let (name, value) = def
                        .split_once('=')
                        .ok_or_else(|| format!("-D expects <name>=<value>, found '{def}'"))?;
                    if name.is_empty() {
                        return Err("-D: variable name cannot be empty".to_owned());
                    }
                    args.defines.push((name.to_owned(), value.to_owned()));
                }

                // -p<digits>
                'p' => {
                    let p = flag_value('p', &chars, &mut j, argv, &mut i)?;
                    args.precision = Some(
                        p.parse()
                            .map_err(|_| format!("invalid precision: {p}"))?,
                    );
                }

                // -r<seed>
                'r' => {
                    let r = flag_value('r', &chars, &mut j, argv, &mut i)?;
                    args.seed = Some(r.parse().map_err(|_| format!("invalid seed: {r}"))?);
                }

                c => return Err(format!("unknown option: -{c}")),
            }
            j += 1;
        }
        i += 1;
    }

    if !positional.is_empty() {
        args.input = Some(positional.join(" "));
    }

    Ok(args)
}

// ── Path helpers ──────────────────────────────────────────────────────────────

/// Search for the settings file in the standard locations.
/// Returns the first path that exists, or `None`.
pub fn find_user_config() -> Option<PathBuf> {
    let platform = ProjectDirs::from("", "", "gamexpr").map(|d| d.config_dir().join("gamexprrc"));
    platform
        .into_iter()
        .chain(std::iter::once(PathBuf::from("./.gamexprrc")))
        .find(|p| p.exists())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
