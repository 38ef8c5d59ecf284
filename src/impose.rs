//! Sheet imposition: pages of cards on a fixed grid, with bleed and crop marks.
//!
//! All lengths are millimetres; the origin is the top-left corner of the page
//! and y grows downwards.

use serde::{Deserialize, Serialize};

use crate::formats::GameRecord;

const FIT_TOLERANCE_MM: f64 = 1e-6;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutMode {
    /// Cells grow by the bleed on every side and the card art fills them.
    #[default]
    Bleed,
    /// Cells are exactly the trim size, butted together and centred.
    NoBleed,
}

/// Marks sit outside each card's trim box. On outer cells they can run past
/// the page edge when the margin is narrower than `offset_mm + length_mm`;
/// the sheet clips that part and layout logs a warning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropMarkConfig {
    pub enabled: bool,
    pub length_mm: f64,
    /// Gap between the trim line and the inner end of each mark.
    pub offset_mm: f64,
}

impl Default for CropMarkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            length_mm: 5.0,
            offset_mm: 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub page_width_mm: f64,
    pub page_height_mm: f64,
    pub card_width_mm: f64,
    pub card_height_mm: f64,
    pub bleed_mm: f64,
    pub mode: LayoutMode,
    pub columns: usize,
    pub rows: usize,
    pub crop_marks: CropMarkConfig,
}

impl Default for LayoutConfig {
    /// A4 portrait, poker-size cards, 3×3.
    fn default() -> Self {
        Self {
            page_width_mm: 210.0,
            page_height_mm: 297.0,
            card_width_mm: 63.5,
            card_height_mm: 88.9,
            bleed_mm: 2.0,
            mode: LayoutMode::Bleed,
            columns: 3,
            rows: 3,
            crop_marks: CropMarkConfig::default(),
        }
    }
}

impl LayoutConfig {
    pub fn capacity(&self) -> usize {
        self.columns * self.rows
    }

    /// Bleed actually applied to each cell side.
    pub fn effective_bleed(&self) -> f64 {
        match self.mode {
            LayoutMode::Bleed => self.bleed_mm,
            LayoutMode::NoBleed => 0.0,
        }
    }

    pub fn cell_width(&self) -> f64 {
        self.card_width_mm + 2.0 * self.effective_bleed()
    }

    pub fn cell_height(&self) -> f64 {
        self.card_height_mm + 2.0 * self.effective_bleed()
    }

    /// Left and top page margins that centre the grid.
    pub fn margins(&self) -> (f64, f64) {
        (
            (self.page_width_mm - self.columns as f64 * self.cell_width()) / 2.0,
            (self.page_height_mm - self.rows as f64 * self.cell_height()) / 2.0,
        )
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, value) in [
            ("page_width_mm", self.page_width_mm),
            ("page_height_mm", self.page_height_mm),
            ("card_width_mm", self.card_width_mm),
            ("card_height_mm", self.card_height_mm),
        ] {
            if !value.is_finite() || value <= 0.0 {
                anyhow::bail!("{name} must be a positive length (got {value})");
            }
        }
        if !self.bleed_mm.is_finite() || self.bleed_mm < 0.0 {
            anyhow::bail!("bleed_mm must be >= 0 (got {})", self.bleed_mm);
        }
        if self.columns == 0 || self.rows == 0 {
            anyhow::bail!(
                "grid must have at least one cell (got {}x{})",
                self.columns,
                self.rows
            );
        }

        let (margin_x, margin_y) = self.margins();
        if margin_x < -FIT_TOLERANCE_MM || margin_y < -FIT_TOLERANCE_MM {
            anyhow::bail!(
                "{}x{} grid of {:.2}x{:.2}mm cells does not fit a {}x{}mm page",
                self.columns,
                self.rows,
                self.cell_width(),
                self.cell_height(),
                self.page_width_mm,
                self.page_height_mm
            );
        }

        let marks = &self.crop_marks;
        if marks.enabled {
            if !marks.length_mm.is_finite() || marks.length_mm <= 0.0 {
                anyhow::bail!("crop mark length must be > 0 (got {})", marks.length_mm);
            }
            if !marks.offset_mm.is_finite() || marks.offset_mm < 0.0 {
                anyhow::bail!("crop mark offset must be >= 0 (got {})", marks.offset_mm);
            }
            if marks.offset_mm + FIT_TOLERANCE_MM < self.effective_bleed() {
                anyhow::bail!(
                    "crop mark offset {}mm would reach into the {}mm bleed",
                    marks.offset_mm,
                    self.effective_bleed()
                );
            }
            let overhang = self.crop_mark_overhang();
            if overhang > FIT_TOLERANCE_MM {
                tracing::warn!(
                    overhang_mm = overhang,
                    "crop marks on outer cells extend past the page edge and will be clipped"
                );
            }
        }

        Ok(())
    }

    /// How far the outermost crop marks reach past the page edge (0 when
    /// they fit or are disabled).
    pub fn crop_mark_overhang(&self) -> f64 {
        if !self.crop_marks.enabled {
            return 0.0;
        }
        let reach = self.crop_marks.offset_mm + self.crop_marks.length_mm;
        let (margin_x, margin_y) = self.margins();
        let bleed = self.effective_bleed();
        (reach - (margin_x + bleed))
            .max(reach - (margin_y + bleed))
            .max(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// A straight mark from `(x1, y1)` (end nearest the card) to `(x2, y2)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl Segment {
    pub fn translate(self, dx: f64, dy: f64) -> Self {
        Self {
            x1: self.x1 + dx,
            y1: self.y1 + dy,
            x2: self.x2 + dx,
            y2: self.y2 + dy,
        }
    }

    pub fn length(&self) -> f64 {
        (self.x2 - self.x1).hypot(self.y2 - self.y1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellGeometry {
    pub row: usize,
    pub column: usize,
    /// Area covered by the card art, bleed included.
    pub cell: Rect,
    /// Final cut line.
    pub trim: Rect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub record: GameRecord,
    pub geometry: CellGeometry,
    /// Page coordinates.
    pub crop_marks: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    pub index: usize,
    pub page_width_mm: f64,
    pub page_height_mm: f64,
    pub slots: Vec<Slot>,
}

#[derive(Debug, Clone)]
pub struct ImpositionEngine {
    config: LayoutConfig,
}

impl ImpositionEngine {
    pub fn new(config: LayoutConfig) -> anyhow::Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Splits `records` into sheets of at most `columns * rows` cards, in
    /// input order, filling each sheet row by row.
    pub fn layout(&self, records: &[GameRecord]) -> Vec<Sheet> {
        let sheets = records
            .chunks(self.config.capacity())
            .enumerate()
            .map(|(index, chunk)| Sheet {
                index,
                page_width_mm: self.config.page_width_mm,
                page_height_mm: self.config.page_height_mm,
                slots: chunk
                    .iter()
                    .enumerate()
                    .map(|(position, record)| self.slot(position, record))
                    .collect(),
            })
            .collect::<Vec<_>>();

        tracing::debug!(records = records.len(), sheets = sheets.len(), "layout");
        sheets
    }

    fn slot(&self, position: usize, record: &GameRecord) -> Slot {
        let geometry = self.cell_geometry(position);
        let crop_marks = if self.config.crop_marks.enabled {
            crop_marks(
                geometry.trim.width,
                geometry.trim.height,
                &self.config.crop_marks,
            )
            .into_iter()
            .map(|mark| mark.translate(geometry.trim.x, geometry.trim.y))
            .collect()
        } else {
            Vec::new()
        };

        Slot {
            record: record.clone(),
            geometry,
            crop_marks,
        }
    }

    /// Geometry of the `position`-th cell on a sheet (row-major).
    pub fn cell_geometry(&self, position: usize) -> CellGeometry {
        let config = &self.config;
        let row = position / config.columns;
        let column = position % config.columns;
        let bleed = config.effective_bleed();
        let (margin_x, margin_y) = config.margins();

        let cell = Rect {
            x: margin_x + column as f64 * config.cell_width(),
            y: margin_y + row as f64 * config.cell_height(),
            width: config.cell_width(),
            height: config.cell_height(),
        };
        let trim = Rect {
            x: cell.x + bleed,
            y: cell.y + bleed,
            width: config.card_width_mm,
            height: config.card_height_mm,
        };

        CellGeometry {
            row,
            column,
            cell,
            trim,
        }
    }
}

/// The eight corner marks of a `width` × `height` trim box, relative to the
/// trim box's top-left corner. Bleed plays no part here.
pub fn crop_marks(width: f64, height: f64, marks: &CropMarkConfig) -> Vec<Segment> {
    let near = marks.offset_mm;
    let far = marks.offset_mm + marks.length_mm;
    let horizontal = |y: f64, x_near: f64, x_far: f64| Segment {
        x1: x_near,
        y1: y,
        x2: x_far,
        y2: y,
    };
    let vertical = |x: f64, y_near: f64, y_far: f64| Segment {
        x1: x,
        y1: y_near,
        x2: x,
        y2: y_far,
    };

    vec![
        // top left
        horizontal(0.0, -near, -far),
        vertical(0.0, -near, -far),
        // top right
        horizontal(0.0, width + near, width + far),
        vertical(width, -near, -far),
        // bottom right
        horizontal(height, width + near, width + far),
        vertical(width, height + near, height + far),
        // bottom left
        horizontal(height, -near, -far),
        vertical(0.0, height + near, height + far),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < EPS
    }

    fn records(n: usize) -> Vec<GameRecord> {
        (0..n)
            .map(|i| GameRecord {
                id: format!("g{i}"),
                name: format!("Game {i}"),
                image: None,
                year_published: None,
                min_players: None,
                max_players: None,
                playing_time_minutes: None,
                complexity_weight: None,
                description: None,
                designers: Vec::new(),
                artists: Vec::new(),
            })
            .collect()
    }

    fn engine(config: LayoutConfig) -> ImpositionEngine {
        ImpositionEngine::new(config).unwrap()
    }

    #[test]
    fn sheet_and_slot_counts_follow_record_count() {
        let engine = engine(LayoutConfig::default());
        for n in 0..=30 {
            let sheets = engine.layout(&records(n));
            assert_eq!(sheets.len(), n.div_ceil(9), "sheets for n={n}");
            for (i, sheet) in sheets.iter().enumerate() {
                let expected = if i + 1 < sheets.len() || n % 9 == 0 {
                    9
                } else {
                    n % 9
                };
                assert_eq!(sheet.slots.len(), expected, "slots on sheet {i} for n={n}");
                assert_eq!(sheet.index, i);
            }
        }
    }

    #[test]
    fn input_order_is_preserved_across_sheets() {
        let input = records(20);
        let sheets = engine(LayoutConfig::default()).layout(&input);
        let ids = sheets
            .iter()
            .flat_map(|s| s.slots.iter().map(|slot| slot.record.id.clone()))
            .collect::<Vec<_>>();
        let expected = input.iter().map(|r| r.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids, expected);
    }

    #[test]
    fn bleed_cells_absorb_the_bleed_and_are_centred() {
        let engine = engine(LayoutConfig::default());
        let first = engine.cell_geometry(0);
        assert!(close(first.cell.width, 67.5));
        assert!(close(first.cell.height, 92.9));
        assert!(close(first.cell.x, 3.75));
        assert!(close(first.cell.y, (297.0 - 3.0 * 92.9) / 2.0));
        assert!(close(first.trim.x, first.cell.x + 2.0));
        assert!(close(first.trim.y, first.cell.y + 2.0));
        assert!(close(first.trim.width, 63.5));

        let last = engine.cell_geometry(8);
        assert_eq!((last.row, last.column), (2, 2));
        assert!(close(last.cell.right(), 210.0 - 3.75));
        assert!(close(last.trim.right() + 2.0, last.cell.right()));
    }

    #[test]
    fn no_bleed_cells_are_trim_sized_butted_and_centred() {
        let engine = engine(LayoutConfig {
            mode: LayoutMode::NoBleed,
            ..LayoutConfig::default()
        });
        let a = engine.cell_geometry(0);
        let b = engine.cell_geometry(1);
        let below = engine.cell_geometry(3);

        assert_eq!(a.cell, a.trim);
        assert!(close(a.cell.x, (210.0 - 3.0 * 63.5) / 2.0));
        assert!(close(a.cell.y, (297.0 - 3.0 * 88.9) / 2.0));
        assert!(close(b.cell.x, a.cell.right()));
        assert!(close(below.cell.y, a.cell.bottom()));
    }

    #[test]
    fn crop_marks_relative_to_trim_do_not_depend_on_bleed() {
        let relative_marks = |bleed_mm: f64| {
            let engine = engine(LayoutConfig {
                bleed_mm,
                ..LayoutConfig::default()
            });
            let sheet = engine.layout(&records(9)).remove(0);
            sheet
                .slots
                .iter()
                .map(|slot| {
                    let trim = slot.geometry.trim;
                    slot.crop_marks
                        .iter()
                        .map(|m| m.translate(-trim.x, -trim.y))
                        .collect::<Vec<_>>()
                })
                .collect::<Vec<_>>()
        };

        let reference = relative_marks(0.0);
        for bleed in [1.0, 2.0, 3.0] {
            let other = relative_marks(bleed);
            for (slot_a, slot_b) in reference.iter().zip(&other) {
                assert_eq!(slot_a.len(), 8);
                for (a, b) in slot_a.iter().zip(slot_b) {
                    assert!(close(a.x1, b.x1) && close(a.y1, b.y1), "bleed={bleed}");
                    assert!(close(a.x2, b.x2) && close(a.y2, b.y2), "bleed={bleed}");
                }
            }
        }
    }

    #[test]
    fn crop_marks_stay_outside_the_cards_own_cell() {
        let engine = engine(LayoutConfig::default());
        for position in 0..9 {
            let geometry = engine.cell_geometry(position);
            let sheet = engine.layout(&records(9)).remove(0);
            let slot = &sheet.slots[position];
            let cell = geometry.cell;
            for mark in &slot.crop_marks {
                assert!(close(mark.length(), 5.0));
                for (x, y) in [(mark.x1, mark.y1), (mark.x2, mark.y2)] {
                    let inside = x > cell.x + EPS
                        && x < cell.right() - EPS
                        && y > cell.y + EPS
                        && y < cell.bottom() - EPS;
                    assert!(!inside, "mark point ({x}, {y}) inside cell {position}");
                }
            }
        }
    }

    #[test]
    fn trim_local_marks_start_at_the_offset() {
        let marks = crop_marks(63.5, 88.9, &CropMarkConfig::default());
        assert_eq!(marks.len(), 8);
        assert_eq!(
            marks[0],
            Segment {
                x1: -3.0,
                y1: 0.0,
                x2: -8.0,
                y2: 0.0
            }
        );
        assert_eq!(
            marks[5],
            Segment {
                x1: 63.5,
                y1: 88.9 + 3.0,
                x2: 63.5,
                y2: 88.9 + 8.0
            }
        );
    }

    #[test]
    fn disabled_crop_marks_yield_no_segments() {
        let engine = engine(LayoutConfig {
            crop_marks: CropMarkConfig {
                enabled: false,
                ..CropMarkConfig::default()
            },
            ..LayoutConfig::default()
        });
        let sheets = engine.layout(&records(2));
        assert!(sheets[0].slots.iter().all(|s| s.crop_marks.is_empty()));
    }

    #[test]
    fn crop_mark_overhang_is_measured_from_the_trim_box() {
        // A4 3x3: left trim edge at 3.75 + 2 = 5.75, marks reach 8 beyond it.
        let config = LayoutConfig::default();
        assert!(close(config.crop_mark_overhang(), 2.25));
        assert!(ImpositionEngine::new(config).is_ok());

        let roomy = LayoutConfig {
            columns: 2,
            rows: 2,
            ..LayoutConfig::default()
        };
        assert!(close(roomy.crop_mark_overhang(), 0.0));

        let disabled = LayoutConfig {
            crop_marks: CropMarkConfig {
                enabled: false,
                ..CropMarkConfig::default()
            },
            ..LayoutConfig::default()
        };
        assert!(close(disabled.crop_mark_overhang(), 0.0));
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let too_big = LayoutConfig {
            card_width_mm: 80.0,
            ..LayoutConfig::default()
        };
        assert!(ImpositionEngine::new(too_big).is_err());

        let empty_grid = LayoutConfig {
            columns: 0,
            ..LayoutConfig::default()
        };
        assert!(ImpositionEngine::new(empty_grid).is_err());

        let marks_in_bleed = LayoutConfig {
            bleed_mm: 3.0,
            crop_marks: CropMarkConfig {
                offset_mm: 2.0,
                ..CropMarkConfig::default()
            },
            ..LayoutConfig::default()
        };
        let err = ImpositionEngine::new(marks_in_bleed).unwrap_err().to_string();
        assert!(err.contains("bleed"));

        let no_bleed_small_offset = LayoutConfig {
            mode: LayoutMode::NoBleed,
            bleed_mm: 3.0,
            crop_marks: CropMarkConfig {
                offset_mm: 1.0,
                ..CropMarkConfig::default()
            },
            ..LayoutConfig::default()
        };
        assert!(ImpositionEngine::new(no_bleed_small_offset).is_ok());
    }
}
