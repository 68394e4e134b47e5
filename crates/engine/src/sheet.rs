//! The sheet: grid ownership, cell lifecycle, dependency bookkeeping.
//!
//! All mutation funnels through [`Sheet::set_cell`], which runs the full
//! protocol: classify the text, materialize placeholder cells for new
//! references, reject cycles before touching anything, swap content, rewrite
//! graph edges, and invalidate stale caches transitively.

use std::io::{self, Write};

use rustc_hash::{FxHashMap, FxHashSet};

use crate::cell::{Cell, CellContent, CellValue};
use crate::dep_graph::DepGraph;
use crate::error::SheetError;
use crate::formula::SheetView;
use crate::position::{Position, Size};
use crate::recalc::RecalcSummary;

/// A single spreadsheet: resizable 2-D grid of cells plus their dependency
/// graph.
#[derive(Debug, Default)]
pub struct Sheet {
    /// Row-major jagged storage; each row grows independently, so the grid
    /// only materializes what it has seen.
    cells: Vec<Vec<Option<Cell>>>,
    graph: DepGraph,
}

/// Create a fresh empty sheet.
pub fn create_sheet() -> Sheet {
    Sheet::new()
}

impl SheetView for Sheet {
    fn cell_value(&self, pos: Position) -> Option<CellValue> {
        self.slot(pos).map(|cell| cell.value(self))
    }
}

impl Sheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a cell's content from raw text.
    ///
    /// The steps, in order:
    /// 1. reject invalid positions;
    /// 2. classify the text (empty / text / formula), surfacing parse errors;
    /// 3. materialize every referenced-but-missing valid position as an
    ///    Empty placeholder (pre-committed; harmless on rejection, since
    ///    Empty cells are inert);
    /// 4. reject the assignment if it would close a dependency cycle;
    ///    the target cell and the graph stay untouched;
    /// 5. swap in the new content and rewrite the cell's graph edges;
    /// 6. invalidate the caches of everything that could observe the change.
    pub fn set_cell(&mut self, pos: Position, text: &str) -> Result<(), SheetError> {
        if !pos.is_valid() {
            return Err(SheetError::InvalidPosition(pos));
        }
        let content = CellContent::classify(text)?;
        let refs = match &content {
            CellContent::Formula(formula) => formula.referenced_cells(),
            _ => Vec::new(),
        };

        for &r in &refs {
            if self.slot(r).is_none() {
                self.grow_to(r);
                self.cells[r.row][r.col] = Some(Cell::default());
            }
        }

        if let Some(report) = self.graph.would_create_cycle(pos, &refs) {
            return Err(SheetError::CircularDependency(report));
        }

        self.grow_to(pos);
        match &mut self.cells[pos.row][pos.col] {
            Some(cell) => cell.replace_content(content),
            slot => *slot = Some(Cell::new(content)),
        }
        self.graph.replace_edges(pos, refs.into_iter().collect());
        self.invalidate_from(pos);
        Ok(())
    }

    /// Bounds-checked cell access.
    ///
    /// Returns `Ok(None)` outside the materialized extent or where the slot
    /// is empty. Empty placeholder cells ARE returned; callers that want
    /// "printably empty" should check `cell.text().is_empty()`.
    pub fn cell(&self, pos: Position) -> Result<Option<&Cell>, SheetError> {
        if !pos.is_valid() {
            return Err(SheetError::InvalidPosition(pos));
        }
        Ok(self.slot(pos))
    }

    /// Clear a cell.
    ///
    /// Absent cells are a no-op. A cleared cell is demoted to Empty, and its
    /// slot is released only if no formula still references it; referenced
    /// cells stay addressable as placeholders.
    pub fn clear_cell(&mut self, pos: Position) -> Result<(), SheetError> {
        if !pos.is_valid() {
            return Err(SheetError::InvalidPosition(pos));
        }
        if self.slot(pos).is_none() {
            return Ok(());
        }
        self.set_cell(pos, "")?;
        if !self.graph.is_referenced(pos) {
            self.cells[pos.row][pos.col] = None;
        }
        Ok(())
    }

    /// True if at least one formula references this position.
    pub fn is_referenced(&self, pos: Position) -> bool {
        self.graph.is_referenced(pos)
    }

    /// Smallest bounding rectangle, anchored at the origin, covering every
    /// cell whose text is non-empty.
    pub fn printable_size(&self) -> Size {
        let mut size = Size::default();
        for (row, cells) in self.cells.iter().enumerate() {
            for (col, slot) in cells.iter().enumerate() {
                if let Some(cell) = slot {
                    if !cell.text().is_empty() {
                        size.rows = size.rows.max(row + 1);
                        size.cols = size.cols.max(col + 1);
                    }
                }
            }
        }
        size
    }

    /// Print computed values over the printable area, tab-separated,
    /// one line per row. Empty slots print nothing between the tabs.
    pub fn print_values<W: Write>(&self, output: &mut W) -> io::Result<()> {
        let size = self.printable_size();
        for row in 0..size.rows {
            for col in 0..size.cols {
                if col > 0 {
                    output.write_all(b"\t")?;
                }
                if let Some(cell) = self.slot(Position::new(row, col)) {
                    write!(output, "{}", cell.value(self))?;
                }
            }
            output.write_all(b"\n")?;
        }
        Ok(())
    }

    /// Print source texts over the printable area, tab-separated,
    /// one line per row.
    pub fn print_texts<W: Write>(&self, output: &mut W) -> io::Result<()> {
        let size = self.printable_size();
        for row in 0..size.rows {
            for col in 0..size.cols {
                if col > 0 {
                    output.write_all(b"\t")?;
                }
                if let Some(cell) = self.slot(Position::new(row, col)) {
                    output.write_all(cell.text().as_bytes())?;
                }
            }
            output.write_all(b"\n")?;
        }
        Ok(())
    }

    /// Drop every formula cache and re-evaluate all formulas in dependency
    /// order. Returns a report suitable for logging.
    pub fn recalculate(&mut self) -> RecalcSummary {
        let start = std::time::Instant::now();

        for row in &self.cells {
            for cell in row.iter().flatten() {
                cell.clear_cache();
            }
        }

        let mut summary = RecalcSummary::new();
        let graph_formulas: FxHashSet<Position> = self.graph.formula_cells().collect();

        // Formulas with references, in topological order.
        if let Ok(order) = self.graph.topo_order() {
            let mut depths: FxHashMap<Position, usize> = FxHashMap::default();
            for pos in order {
                let depth = 1 + self
                    .graph
                    .precedents(pos)
                    .filter_map(|p| depths.get(&p).copied())
                    .max()
                    .unwrap_or(0);
                depths.insert(pos, depth);
                if let Some(cell) = self.slot(pos) {
                    let _ = cell.value(self);
                }
                summary.cells_recomputed += 1;
                summary.max_depth = summary.max_depth.max(depth);
            }
        }

        // Reference-free formulas (`=1+2`) carry no graph edges; sweep the
        // grid for them.
        for (row, cells) in self.cells.iter().enumerate() {
            for (col, slot) in cells.iter().enumerate() {
                if let Some(cell) = slot {
                    let pos = Position::new(row, col);
                    if matches!(cell.content(), CellContent::Formula(_))
                        && !graph_formulas.contains(&pos)
                    {
                        let _ = cell.value(self);
                        summary.cells_recomputed += 1;
                        summary.max_depth = summary.max_depth.max(1);
                    }
                }
            }
        }

        summary.duration_ms = start.elapsed().as_millis() as u64;
        summary
    }

    /// Access the dependency graph (read-only).
    pub fn graph(&self) -> &DepGraph {
        &self.graph
    }

    /// Iterate over all materialized cells, placeholders included.
    pub fn cells_iter(&self) -> impl Iterator<Item = (Position, &Cell)> + '_ {
        self.cells.iter().enumerate().flat_map(|(row, cells)| {
            cells.iter().enumerate().filter_map(move |(col, slot)| {
                slot.as_ref().map(|cell| (Position::new(row, col), cell))
            })
        })
    }

    fn slot(&self, pos: Position) -> Option<&Cell> {
        self.cells.get(pos.row)?.get(pos.col)?.as_ref()
    }

    fn grow_to(&mut self, pos: Position) {
        if self.cells.len() <= pos.row {
            self.cells.resize_with(pos.row + 1, Vec::new);
        }
        let row = &mut self.cells[pos.row];
        if row.len() <= pos.col {
            row.resize_with(pos.col + 1, || None);
        }
    }

    /// Reset the cache at `origin` and of every cell that could observe its
    /// change, walking dependents. Descent stops at cells that are already
    /// uncached: their dependents were invalidated when they first went
    /// stale, so nothing below them can still hold a cache.
    fn invalidate_from(&self, origin: Position) {
        if let Some(cell) = self.slot(origin) {
            cell.clear_cache();
        }
        let mut stack: Vec<Position> = self.graph.dependents(origin).collect();
        while let Some(pos) = stack.pop() {
            if let Some(cell) = self.slot(pos) {
                if cell.has_cache() {
                    cell.clear_cache();
                    stack.extend(self.graph.dependents(pos));
                }
            }
        }
    }
}
