//! Common test fixtures.

/// Extents as `(left, bottom, right, top)`.
pub mod bbox {
    /// Around Zurich, in degrees.
    pub const ZURICH: (f64, f64, f64, f64) = (8.4, 47.3, 8.7, 47.45);

    /// UTM zone 32N metres, roughly the same area as [`ZURICH`].
    pub const ZURICH_UTM32: (f64, f64, f64, f64) = (455_000.0, 5_240_000.0, 480_000.0, 5_255_000.0);
}

/// Grid layouts used across the tests.
pub mod grid {
    /// A 4x4 unit grid whose top-left corner sits at (0, 4).
    pub const UNIT_4X4: GridSpec = GridSpec {
        width: 4,
        height: 4,
        west: 0.0,
        north: 4.0,
        xsize: 1.0,
        ysize: 1.0,
    };

    /// 0.1 degree cells over [`super::bbox::ZURICH`].
    pub const ZURICH_DEG: GridSpec = GridSpec {
        width: 3,
        height: 2,
        west: 8.4,
        north: 47.5,
        xsize: 0.1,
        ysize: 0.1,
    };

    #[derive(Debug, Clone, Copy)]
    pub struct GridSpec {
        pub width: usize,
        pub height: usize,
        pub west: f64,
        pub north: f64,
        pub xsize: f64,
        pub ysize: f64,
    }

    impl GridSpec {
        /// `(left, bottom, right, top)`
        pub fn bbox(&self) -> (f64, f64, f64, f64) {
            (
                self.west,
                self.north - self.ysize * self.height as f64,
                self.west + self.xsize * self.width as f64,
                self.north,
            )
        }
    }
}

/// WKT geometries in [`grid::UNIT_4X4`] coordinates.
pub mod wkt {
    /// Covers the central 2x2 pixels.
    pub const CENTER_SQUARE: &str = "POLYGON ((1 1, 3 1, 3 3, 1 3, 1 1))";

    /// Covers the whole grid.
    pub const FULL_EXTENT: &str = "POLYGON ((0 0, 4 0, 4 4, 0 4, 0 0))";

    /// Entirely outside the grid.
    pub const DISJOINT: &str = "POLYGON ((10 10, 11 10, 11 11, 10 11, 10 10))";

    /// Full extent with the central square cut out.
    pub const FRAME: &str = "POLYGON ((0 0, 4 0, 4 4, 0 4, 0 0), (1 1, 3 1, 3 3, 1 3, 1 1))";
}
