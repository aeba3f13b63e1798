use crossterm::style::Color;

/// Color theme for terminal output
#[derive(Debug, Clone)]
pub struct Theme {
    /// Default text color
    pub fg: Color,
    /// Grid border color
    pub border: Color,
    /// Star given in the puzzle
    pub star: Color,
    /// Star found by the solver
    pub new_star: Color,
    /// Cell ruled out
    pub empty: Color,
    /// Cell still open before the search
    pub unknown: Color,
    /// Secondary text color
    pub info: Color,
    /// Headings
    pub key: Color,
    pub success: Color,
    pub error: Color,
    /// Probability bars
    pub bar: Color,
    /// Cell backgrounds, indexed by region id modulo the palette size
    pub regions: [Color; 8],
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            fg: Color::Rgb { r: 230, g: 230, b: 240 },
            border: Color::Rgb { r: 70, g: 75, b: 90 },
            star: Color::Rgb { r: 255, g: 255, b: 255 },
            new_star: Color::Rgb { r: 255, g: 210, b: 100 },
            empty: Color::Rgb { r: 110, g: 115, b: 135 },
            unknown: Color::Rgb { r: 80, g: 180, b: 255 },
            info: Color::Rgb { r: 160, g: 165, b: 185 },
            key: Color::Rgb { r: 255, g: 210, b: 100 },
            success: Color::Rgb { r: 90, g: 255, b: 130 },
            error: Color::Rgb { r: 255, g: 90, b: 90 },
            bar: Color::Rgb { r: 80, g: 180, b: 255 },
            regions: [
                Color::Rgb { r: 60, g: 40, b: 70 },
                Color::Rgb { r: 30, g: 60, b: 80 },
                Color::Rgb { r: 40, g: 70, b: 45 },
                Color::Rgb { r: 80, g: 60, b: 30 },
                Color::Rgb { r: 75, g: 35, b: 40 },
                Color::Rgb { r: 35, g: 50, b: 90 },
                Color::Rgb { r: 65, g: 75, b: 35 },
                Color::Rgb { r: 45, g: 70, b: 75 },
            ],
        }
    }

    pub fn light() -> Self {
        Self {
            fg: Color::Rgb { r: 30, g: 30, b: 40 },
            border: Color::Rgb { r: 180, g: 180, b: 195 },
            star: Color::Rgb { r: 0, g: 0, b: 0 },
            new_star: Color::Rgb { r: 200, g: 120, b: 20 },
            empty: Color::Rgb { r: 130, g: 130, b: 150 },
            unknown: Color::Rgb { r: 30, g: 100, b: 200 },
            info: Color::Rgb { r: 90, g: 90, b: 110 },
            key: Color::Rgb { r: 200, g: 120, b: 20 },
            success: Color::Rgb { r: 40, g: 160, b: 60 },
            error: Color::Rgb { r: 220, g: 50, b: 50 },
            bar: Color::Rgb { r: 30, g: 100, b: 200 },
            regions: [
                Color::Rgb { r: 235, g: 215, b: 240 },
                Color::Rgb { r: 210, g: 230, b: 245 },
                Color::Rgb { r: 215, g: 240, b: 215 },
                Color::Rgb { r: 250, g: 230, b: 200 },
                Color::Rgb { r: 245, g: 210, b: 215 },
                Color::Rgb { r: 215, g: 220, b: 250 },
                Color::Rgb { r: 235, g: 240, b: 200 },
                Color::Rgb { r: 205, g: 240, b: 240 },
            ],
        }
    }

    /// Background for a region
    pub fn region(&self, id: usize) -> Color {
        self.regions[id % self.regions.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_palette_wraps() {
        let theme = Theme::dark();
        assert_eq!(theme.region(0), theme.region(8));
        assert_ne!(theme.region(0), theme.region(1));
    }
}
