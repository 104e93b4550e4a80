/// Dot bit for each (x, y) position inside a 2x4 Braille cell, indexed `[y][x]`
const DOT_BITS: [[u8; 2]; 4] = [[0x01, 0x08], [0x02, 0x10], [0x04, 0x20], [0x40, 0x80]];

/// First codepoint of the Unicode Braille block (no dots raised)
const BRAILLE_BASE: u32 = 0x2800;

/// Character grid where every cell is a 2x4 dot matrix.
/// Pixel resolution is `width * 2` by `height * 4`.
pub struct BrailleCanvas {
    width: usize,
    height: usize,
    cells: Vec<u8>,
}

impl BrailleCanvas {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![0; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Raise the dot at pixel (x, y); out-of-range pixels are ignored
    pub fn set_pixel(&mut self, x: usize, y: usize) {
        let (cx, cy) = (x / 2, y / 4);
        if cx >= self.width || cy >= self.height {
            return;
        }
        self.cells[cy * self.width + cx] |= DOT_BITS[y % 4][x % 2];
    }

    /// Same as `set_pixel` but accepts off-canvas negative coordinates
    pub fn set_pixel_signed(&mut self, x: i32, y: i32) {
        if x >= 0 && y >= 0 {
            self.set_pixel(x as usize, y as usize);
        }
    }

    /// True when no dot has been raised
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|&c| c == 0)
    }

    /// Braille character of a cell, `None` outside the grid
    pub fn cell(&self, col: usize, row: usize) -> Option<char> {
        if col >= self.width || row >= self.height {
            return None;
        }
        char::from_u32(BRAILLE_BASE + self.cells[row * self.width + col] as u32)
    }

    /// One text row of Braille characters
    pub fn row_to_string(&self, row: usize) -> String {
        (0..self.width).filter_map(|col| self.cell(col, row)).collect()
    }

    pub fn rows(&self) -> impl Iterator<Item = String> + '_ {
        (0..self.height).map(|row| self.row_to_string(row))
    }
}
