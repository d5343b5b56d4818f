use std::{env, iter::Peekable, path::PathBuf, str::Chars};

use crate::error::{PathError, PathResult};

/// Resolves a user-supplied path string into an absolute [`PathBuf`].
///
/// `$VAR` and `${VAR}` are expanded from the environment, a leading `~` becomes the
/// home directory, and relative results are joined onto the current directory.
///
/// # Errors
///
/// * [`PathError::Empty`] if the input is blank
/// * [`PathError::MissingEnvVar`] if a referenced variable is unset
/// * [`PathError::UnclosedVariable`] for `${` without a closing brace
/// * [`PathError::CurrentDir`] if the working directory cannot be read
///
/// # Example
///
/// ```no_run
/// use mirrorgen_utils::path::resolve_path;
///
/// let out = resolve_path("~/mirror").unwrap();
/// assert!(out.is_absolute());
/// ```
pub fn resolve_path(path: &str) -> PathResult<PathBuf> {
    let path = path.trim();

    if path.is_empty() {
        return Err(PathError::Empty);
    }

    let path_buf = PathBuf::from(expand_variables(path)?);

    if path_buf.is_absolute() {
        Ok(path_buf)
    } else {
        env::current_dir()
            .map(|cwd| cwd.join(path_buf))
            .map_err(|err| {
                PathError::CurrentDir {
                    source: err,
                }
            })
    }
}

/// Returns `$HOME`, falling back to `/home/$USER`.
pub fn home_dir() -> PathBuf {
    env::var("HOME").map(PathBuf::from).unwrap_or_else(|_| {
        let user = env::var("USER").unwrap_or_else(|_| "root".to_string());
        PathBuf::from(format!("/home/{user}"))
    })
}

/// Returns `$XDG_CONFIG_HOME`, defaulting to `$HOME/.config`.
pub fn xdg_config_home() -> PathBuf {
    env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

fn expand_variables(path: &str) -> PathResult<String> {
    let mut result = String::with_capacity(path.len());
    let mut chars = path.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '$' if chars.peek() == Some(&'{') => {
                chars.next();
                let name = take_until_brace(&mut chars)?;
                push_env_var(&name, path, &mut result)?;
            }
            '$' => {
                let name = take_var_name(&mut chars);
                if name.is_empty() {
                    result.push('$');
                } else {
                    push_env_var(&name, path, &mut result)?;
                }
            }
            '~' if result.is_empty() => result.push_str(&home_dir().to_string_lossy()),
            _ => result.push(c),
        }
    }

    Ok(result)
}

fn take_until_brace(chars: &mut Peekable<Chars>) -> PathResult<String> {
    let mut name = String::new();
    for c in chars.by_ref() {
        if c == '}' {
            return Ok(name);
        }
        name.push(c);
    }
    Err(PathError::UnclosedVariable {
        input: format!("${{{name}"),
    })
}

fn take_var_name(chars: &mut Peekable<Chars>) -> String {
    let mut name = String::new();
    while let Some(&c) = chars.peek() {
        if !(c.is_alphanumeric() || c == '_') {
            break;
        }
        name.push(c);
        chars.next();
    }
    name
}

fn push_env_var(name: &str, original: &str, out: &mut String) -> PathResult<()> {
    match name {
        "HOME" => out.push_str(&home_dir().to_string_lossy()),
        "XDG_CONFIG_HOME" => out.push_str(&xdg_config_home().to_string_lossy()),
        _ => {
            let value = env::var(name).map_err(|_| {
                PathError::MissingEnvVar {
                    var: name.into(),
                    input: original.into(),
                }
            })?;
            out.push_str(&value);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[test]
    #[serial]
    fn test_resolve_path_expands_variables() {
        env::set_var("MIRRORGEN_TEST_OUT", "/srv/out");
        assert_eq!(
            resolve_path("$MIRRORGEN_TEST_OUT/batches").unwrap(),
            PathBuf::from("/srv/out/batches")
        );
        assert_eq!(
            resolve_path("${MIRRORGEN_TEST_OUT}/batches").unwrap(),
            PathBuf::from("/srv/out/batches")
        );
        env::remove_var("MIRRORGEN_TEST_OUT");
    }

    #[test]
    #[serial]
    fn test_resolve_path_tilde() {
        env::set_var("HOME", "/tmp/home");
        assert_eq!(
            resolve_path("~/mirror").unwrap(),
            PathBuf::from("/tmp/home/mirror")
        );
    }

    #[test]
    #[serial]
    fn test_resolve_path_relative_is_absolute() {
        let resolved = resolve_path("out").unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("out"));
    }

    #[test]
    fn test_resolve_path_errors() {
        assert!(matches!(resolve_path("   "), Err(PathError::Empty)));
        assert!(matches!(
            resolve_path("${UNCLOSED"),
            Err(PathError::UnclosedVariable { .. })
        ));
        assert!(matches!(
            resolve_path("$MIRRORGEN_SURELY_UNSET_VAR/x"),
            Err(PathError::MissingEnvVar { .. })
        ));
    }

    #[test]
    fn test_lone_dollar_kept() {
        assert_eq!(expand_variables("/tmp/$").unwrap(), "/tmp/$");
    }

    #[test]
    #[serial]
    fn test_xdg_config_home() {
        env::set_var("HOME", "/tmp/home");
        env::remove_var("XDG_CONFIG_HOME");
        assert_eq!(xdg_config_home(), PathBuf::from("/tmp/home/.config"));

        env::set_var("XDG_CONFIG_HOME", "/tmp/config");
        assert_eq!(xdg_config_home(), PathBuf::from("/tmp/config"));
        env::remove_var("XDG_CONFIG_HOME");
    }
}
