//! Terminal drawing side effects for the TDRAW opcodes.
//!
//! Pure output operations: they move the cursor and emit characters,
//! and never touch registers, memory, or flags. Cell coordinates are
//! zero-based; values beyond the 16-bit cursor range are saturated.

use crossterm::{cursor, execute, style::Print, terminal};
use std::io::{self, stdout};

/// Clear the screen and home the cursor.
pub fn clear() -> io::Result<()> {
    execute!(
        stdout(),
        terminal::Clear(terminal::ClearType::All),
        cursor::MoveTo(0, 0)
    )
}

/// Draw one character at the given cell.
pub fn pixel(x: u32, y: u32, ch: char) -> io::Result<()> {
    let col = x.min(u16::MAX as u32) as u16;
    let row = y.min(u16::MAX as u32) as u16;
    execute!(stdout(), cursor::MoveTo(col, row), Print(ch))
}
