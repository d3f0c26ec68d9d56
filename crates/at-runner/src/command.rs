//! Command line construction for target algorithm calls.
//!
//! The resulting argv has the shape
//! `<command...> --instance <i> --cutoff <c> --seed <s> --config -<p1> <v1> ...`.

use at_types::Configuration;

/// Build the argv for a single call.
pub fn build_command(
    template: &[String],
    configuration: &Configuration,
    instance: &str,
    cutoff: f64,
    seed: i64,
) -> Vec<String> {
    let mut argv = Vec::with_capacity(template.len() + 7 + 2 * configuration.len());
    argv.extend(template.iter().cloned());
    argv.extend([
        "--instance".to_string(),
        instance.to_string(),
        "--cutoff".to_string(),
        format_cutoff(cutoff),
        "--seed".to_string(),
        seed.to_string(),
        "--config".to_string(),
    ]);
    for (name, value) in configuration {
        argv.push(format!("-{name}"));
        argv.push(value.clone());
    }
    argv
}

/// Integral cutoffs keep a trailing `.0` so wrappers always see a decimal.
pub fn format_cutoff(cutoff: f64) -> String {
    if cutoff.is_finite() && cutoff.fract() == 0.0 && cutoff.abs() < 1e16 {
        format!("{cutoff:.1}")
    } else {
        format!("{cutoff}")
    }
}

/// Render argv for log output, quoting arguments a shell would split.
pub fn display_command(argv: &[String]) -> String {
    argv.iter()
        .map(|arg| {
            if arg.is_empty() {
                "''".to_string()
            } else if arg
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || "-_./:=+,".contains(c))
            {
                arg.clone()
            } else {
                format!("'{}'", arg.replace('\'', "'\"'\"'"))
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn builds_documented_argv() {
        let mut configuration = Configuration::new();
        configuration.insert("x".into(), "1".into());
        configuration.insert("y".into(), "2".into());

        let argv = build_command(&strings(&["prog"]), &configuration, "inst1", 10.0, 5);
        assert_eq!(
            argv,
            strings(&[
                "prog",
                "--instance",
                "inst1",
                "--cutoff",
                "10.0",
                "--seed",
                "5",
                "--config",
                "-x",
                "1",
                "-y",
                "2"
            ])
        );
    }

    #[test]
    fn empty_configuration_ends_with_config_marker() {
        let argv = build_command(
            &strings(&["python", "wrapper.py"]),
            &Configuration::new(),
            "0",
            1.5,
            -3,
        );
        assert_eq!(
            argv,
            strings(&[
                "python",
                "wrapper.py",
                "--instance",
                "0",
                "--cutoff",
                "1.5",
                "--seed",
                "-3",
                "--config"
            ])
        );
    }

    #[test]
    fn configuration_order_is_deterministic() {
        let mut a = Configuration::new();
        a.insert("zeta".into(), "1".into());
        a.insert("alpha".into(), "2".into());
        let mut b = Configuration::new();
        b.insert("alpha".into(), "2".into());
        b.insert("zeta".into(), "1".into());

        let template = strings(&["prog"]);
        assert_eq!(
            build_command(&template, &a, "i", 1.0, 1),
            build_command(&template, &b, "i", 1.0, 1)
        );
    }

    #[test]
    fn cutoff_formatting() {
        assert_eq!(format_cutoff(10.0), "10.0");
        assert_eq!(format_cutoff(0.25), "0.25");
        assert_eq!(format_cutoff(99_999_999_999_999.0), "99999999999999.0");
    }

    #[test]
    fn display_quotes_whitespace() {
        let argv = strings(&["prog", "--instance", "my file.cnf", "-p", "it's"]);
        assert_eq!(
            display_command(&argv),
            "prog --instance 'my file.cnf' -p 'it'\"'\"'s'"
        );
    }
}
