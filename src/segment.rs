//! Vertical page segmentation
//!
//! A page is mapped by its anchors: horizontal separator rules, located
//! title lines, and a synthetic page-bottom marker. Sorting the anchors
//! top-to-bottom turns the page into an ordered timeline; every span from a
//! separator down to the next anchor is a candidate footnote block.

use log::debug;

/// What produced an anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorKind {
    /// A horizontal separator rule
    Separator,
    /// The top of a title-pattern text line
    Title,
    /// The bottom edge of the page
    PageBottom,
}

/// A labeled vertical position on a page, top-down coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub kind: AnchorKind,
    pub y: f32,
}

/// A vertical span between two consecutive anchors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Block {
    pub top: f32,
    pub bottom: f32,
}

/// Build the sorted anchor timeline for a page.
///
/// Separators come first, then titles, then the bottom marker; the sort is
/// stable, so anchors sharing a y keep that order. Ties only affect
/// zero-height blocks, which extract no text.
pub fn build_anchors(separator_ys: &[f32], title_ys: &[f32], page_height: f32) -> Vec<Anchor> {
    let mut anchors: Vec<Anchor> = Vec::with_capacity(separator_ys.len() + title_ys.len() + 1);
    anchors.extend(separator_ys.iter().map(|&y| Anchor {
        kind: AnchorKind::Separator,
        y,
    }));
    anchors.extend(title_ys.iter().map(|&y| Anchor {
        kind: AnchorKind::Title,
        y,
    }));
    anchors.push(Anchor {
        kind: AnchorKind::PageBottom,
        y: page_height,
    });

    anchors.sort_by(|a, b| a.y.partial_cmp(&b.y).unwrap_or(std::cmp::Ordering::Equal));
    anchors
}

/// Emit one block per separator anchor, spanning down to the next anchor.
///
/// Separators are mandatory scaffolding: with none present there is nothing
/// to bound a block and the page yields no blocks at all. The synthetic
/// bottom anchor guarantees every separator has a following anchor.
pub fn segment_blocks(anchors: &[Anchor]) -> Vec<Block> {
    if !anchors.iter().any(|a| a.kind == AnchorKind::Separator) {
        debug!("no separator anchors; page yields no blocks");
        return Vec::new();
    }

    let mut blocks = Vec::new();
    for (i, anchor) in anchors.iter().enumerate() {
        if anchor.kind != AnchorKind::Separator {
            continue;
        }
        if let Some(next) = anchors.get(i + 1) {
            blocks.push(Block {
                top: anchor.y,
                bottom: next.y,
            });
        }
    }
    blocks
}
