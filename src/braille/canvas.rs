/// Braille Unicode canvas for high-resolution terminal graphics.
/// Each character cell packs a 2x4 dot grid (U+2800..U+28FF), so a
/// `width x height` character canvas holds `width*2 x height*4` dots.
pub struct BrailleCanvas {
    width: usize,  // Characters
    height: usize, // Characters
    cells: Vec<u8>, // Row-major dot masks, one byte per character
}

/// Dot bit per (x % 2, y % 4) within a cell:
/// ```text
/// (0,0) (1,0)   bits: 0x01 0x08
/// (0,1) (1,1)   bits: 0x02 0x10
/// (0,2) (1,2)   bits: 0x04 0x20
/// (0,3) (1,3)   bits: 0x40 0x80
/// ```
const DOT_BITS: [[u8; 2]; 4] = [
    [0x01, 0x08],
    [0x02, 0x10],
    [0x04, 0x20],
    [0x40, 0x80],
];

impl BrailleCanvas {
    /// Create a canvas with the given character dimensions.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![0u8; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Dot-grid width (2 dots per character column).
    pub fn pixel_width(&self) -> usize {
        self.width * 2
    }

    /// Dot-grid height (4 dots per character row).
    pub fn pixel_height(&self) -> usize {
        self.height * 4
    }

    /// Set the dot at pixel coordinates. Out-of-bounds is ignored.
    pub fn set_pixel(&mut self, x: usize, y: usize) {
        let cx = x / 2;
        let cy = y / 4;
        if cx >= self.width || cy >= self.height {
            return;
        }
        self.cells[cy * self.width + cx] |= DOT_BITS[y % 4][x % 2];
    }

    /// Set a dot using signed coordinates (negative values are ignored).
    pub fn set_pixel_signed(&mut self, x: i32, y: i32) {
        if x >= 0 && y >= 0 {
            self.set_pixel(x as usize, y as usize);
        }
    }

    /// Iterate a character row as braille glyphs (blank cells yield U+2800).
    pub fn row_chars(&self, row: usize) -> impl Iterator<Item = char> + '_ {
        let start = row * self.width;
        self.cells[start..start + self.width]
            .iter()
            .map(|&mask| char::from_u32(0x2800 + mask as u32).unwrap_or(' '))
    }

    /// Iterate all rows as strings (for line-by-line rendering).
    pub fn rows(&self) -> impl Iterator<Item = String> + '_ {
        (0..self.height).map(|row| self.row_chars(row).collect())
    }

    #[cfg(test)]
    pub fn to_string(&self) -> String {
        self.rows().collect::<Vec<_>>().join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_dot() {
        let mut canvas = BrailleCanvas::new(1, 1);
        canvas.set_pixel(0, 0);
        assert_eq!(canvas.to_string(), "⠁"); // U+2801
    }

    #[test]
    fn test_all_dots() {
        let mut canvas = BrailleCanvas::new(1, 1);
        for x in 0..2 {
            for y in 0..4 {
                canvas.set_pixel(x, y);
            }
        }
        assert_eq!(canvas.to_string(), "⣿"); // U+28FF
    }

    #[test]
    fn test_diagonal() {
        let mut canvas = BrailleCanvas::new(2, 1);
        canvas.set_pixel(0, 0);
        canvas.set_pixel(1, 1);
        canvas.set_pixel(2, 2);
        canvas.set_pixel(3, 3);
        // First char: (0,0) and (1,1) = 0x01 | 0x10 = 0x11
        // Second char: (0,2) and (1,3) = 0x04 | 0x80 = 0x84
        assert_eq!(canvas.to_string(), "⠑⢄");
    }

    #[test]
    fn test_out_of_bounds_ignored() {
        let mut canvas = BrailleCanvas::new(2, 2);
        canvas.set_pixel(100, 100);
        canvas.set_pixel_signed(-1, 0);
        assert_eq!(canvas.to_string(), "⠀⠀\n⠀⠀");
    }
}
