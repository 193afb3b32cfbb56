use std::io::{self, BufRead, Write};

/// Asks on `input` which event to show. Empty input takes the last known
/// event, `r` reloads the list and `q` or end of input cancels. A value that
/// is not in the list is taken as typed.
pub fn pick_event(
    input: &mut impl BufRead,
    output: &mut impl Write,
    mut load: impl FnMut() -> Vec<String>,
) -> io::Result<Option<String>> {
    let mut ids = load();
    loop {
        if ids.is_empty() {
            writeln!(output, "No events found.")?;
        } else {
            writeln!(output, "Known events:")?;
            for (idx, id) in ids.iter().enumerate() {
                writeln!(output, "  {:>2}) {}", idx + 1, id)?;
            }
        }
        match ids.last() {
            Some(default) => write!(output, "Event [{}] (r = reload, q = quit): ", default)?,
            None => write!(output, "Event (r = reload, q = quit): ")?,
        }
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let answer = line.trim();

        match answer {
            "q" | "Q" => return Ok(None),
            "r" | "R" => {
                ids = load();
                continue;
            }
            "" => return Ok(ids.last().cloned()),
            _ => {}
        }

        if ids.iter().any(|id| id == answer) {
            return Ok(Some(answer.to_string()));
        }
        if let Ok(choice) = answer.parse::<usize>() {
            if (1..=ids.len()).contains(&choice) {
                return Ok(Some(ids[choice - 1].clone()));
            }
        }
        return Ok(Some(answer.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn pick(script: &str, ids: &[&str]) -> Option<String> {
        let ids: Vec<String> = ids.iter().map(|s| s.to_string()).collect();
        let mut output = Vec::new();
        pick_event(&mut script.as_bytes(), &mut output, || ids.clone()).unwrap()
    }

    #[test]
    fn test_enter_takes_the_latest() {
        assert_eq!(pick("\n", &["E1", "E2"]), Some("E2".into()));
    }

    #[test]
    fn test_number_or_name_selects() {
        assert_eq!(pick("1\n", &["E1", "E2"]), Some("E1".into()));
        assert_eq!(pick(" E2 \n", &["E1", "E2"]), Some("E2".into()));
        assert_eq!(pick("2024\n", &["2024", "2025"]), Some("2024".into()));
    }

    #[test]
    fn test_unknown_value_is_accepted() {
        assert_eq!(pick("kupa-3\n", &["E1"]), Some("kupa-3".into()));
    }

    #[test]
    fn test_cancel_paths() {
        assert_eq!(pick("q\n", &["E1"]), None);
        assert_eq!(pick("", &["E1"]), None);
        assert_eq!(pick("\n", &[]), None);
    }

    #[test]
    fn test_reload_fetches_the_list_again() {
        let calls = Cell::new(0);
        let mut output = Vec::new();
        let picked = pick_event(&mut "r\n\n".as_bytes(), &mut output, || {
            calls.set(calls.get() + 1);
            if calls.get() == 1 {
                vec![]
            } else {
                vec!["friss".to_string()]
            }
        })
        .unwrap();

        assert_eq!(calls.get(), 2);
        assert_eq!(picked, Some("friss".into()));
        assert!(String::from_utf8(output).unwrap().contains("No events found."));
    }
}
