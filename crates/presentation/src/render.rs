use std::io::{self, Write};

/// One screen of the presentation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Board {
    pub title: String,
    pub lines: Vec<String>,
    pub meta: String,
}

pub trait Render {
    fn render(&mut self, board: &Board) -> io::Result<()>;
}

/// Draws boards as plain text, optionally clearing the terminal first.
pub struct TerminalRenderer<W: Write> {
    out: W,
    clear: bool,
}

impl TerminalRenderer<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout(), true)
    }
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W, clear: bool) -> Self {
        Self { out, clear }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Render for TerminalRenderer<W> {
    fn render(&mut self, board: &Board) -> io::Result<()> {
        if self.clear {
            write!(self.out, "\x1b[2J\x1b[H")?;
        }
        writeln!(self.out, "{}", board.title)?;
        writeln!(self.out, "{}", "=".repeat(board.title.chars().count()))?;
        if board.lines.is_empty() {
            writeln!(self.out, "(no results yet)")?;
        }
        for line in &board.lines {
            writeln!(self.out, "{}", line)?;
        }
        writeln!(self.out)?;
        writeln!(self.out, "{}", board.meta)?;
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_board_layout() {
        let mut renderer = TerminalRenderer::new(Vec::new(), false);
        renderer
            .render(&Board {
                title: "KKPI_NY — E1".into(),
                lines: vec![" 1. B — 10.00".into()],
                meta: "updated".into(),
            })
            .unwrap();
        let text = String::from_utf8(renderer.into_inner()).unwrap();
        assert_eq!(text, "KKPI_NY — E1\n============\n 1. B — 10.00\n\nupdated\n");
    }

    #[test]
    fn test_empty_board_says_so() {
        let mut renderer = TerminalRenderer::new(Vec::new(), true);
        renderer.render(&Board::default()).unwrap();
        let text = String::from_utf8(renderer.into_inner()).unwrap();
        assert!(text.starts_with("\x1b[2J\x1b[H"));
        assert!(text.contains("(no results yet)"));
    }
}
