//! Page content extraction from PDF using lopdf
//!
//! This module walks each page's content stream and produces positioned text
//! items plus the horizontal ruling lines that clinical TLF layouts use as
//! section separators. All coordinates are normalized top-down (top = 0 at
//! the top edge of the page) so that ascending y is reading order.

use crate::ExtractError;
use log::{debug, warn};
use lopdf::{Document, Object, ObjectId};
use regex::Regex;

/// A text item with position information
#[derive(Debug, Clone)]
pub struct TextItem {
    /// The text content
    pub text: String,
    /// X position on page (left edge of the item's anchor point)
    pub x: f32,
    /// Distance from the top edge of the page
    pub top: f32,
    /// Height (approximated from rendered font size)
    pub height: f32,
    /// Effective font size after matrix scaling
    pub font_size: f32,
}

/// A horizontal ruling line (stroked segment or thin filled rectangle)
#[derive(Debug, Clone, Copy)]
pub struct RuleLine {
    /// Distance from the top edge of the page
    pub y: f32,
    /// Left end
    pub x0: f32,
    /// Right end
    pub x1: f32,
}

/// A line of text (grouped text items)
#[derive(Debug, Clone)]
pub struct TextLine {
    pub items: Vec<TextItem>,
    pub top: f32,
}

impl TextLine {
    pub fn text(&self) -> String {
        self.items
            .iter()
            .map(|i| i.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Everything the layout heuristics need from one page.
#[derive(Debug, Clone)]
pub struct PageContent {
    /// Page number (1-indexed)
    pub index: u32,
    pub width: f32,
    pub height: f32,
    pub items: Vec<TextItem>,
    pub rules: Vec<RuleLine>,
}

/// Segments with |Δy| below this are treated as horizontal.
const HORIZONTAL_EPSILON: f32 = 0.5;
/// Filled rectangles thinner than this act as drawn rules.
const RULE_RECT_MAX_HEIGHT: f32 = 2.0;
/// A rule must span at least this fraction of the page width;
/// shorter strokes are table cell borders and underlines.
const RULE_MIN_SPAN_FRACTION: f32 = 0.1;

impl PageContent {
    /// Build page content from a loaded document.
    ///
    /// Content-stream decode failures degrade to an empty page; a bad page
    /// must not abort extraction of the rest of the document.
    pub fn build(doc: &Document, page_id: ObjectId, index: u32) -> PageContent {
        let (width, height) = page_dimensions(doc, page_id);
        let mut page = PageContent {
            index,
            width,
            height,
            items: Vec::new(),
            rules: Vec::new(),
        };

        match interpret_content(doc, page_id, height) {
            Ok((items, rules)) => {
                page.items = items;
                page.rules = rules;
            }
            Err(e) => {
                warn!("page {}: content stream unreadable ({}), treating as empty", index, e);
            }
        }

        debug!(
            "page {}: {} text items, {} horizontal rules",
            index,
            page.items.len(),
            page.rules.len()
        );
        page
    }

    /// All text lines on the page, top to bottom.
    pub fn text_lines(&self) -> Vec<String> {
        group_into_lines(&self.items)
            .iter()
            .map(|l| l.text())
            .collect()
    }

    /// Text lines whose anchor point falls inside the given rectangle.
    ///
    /// The bottom bound is exclusive so that a line sitting exactly on a
    /// block boundary (e.g. the next title) belongs to the block below it.
    pub fn text_in_region(&self, left: f32, top: f32, right: f32, bottom: f32) -> Vec<String> {
        let region_items: Vec<TextItem> = self
            .items
            .iter()
            .filter(|i| i.top >= top && i.top < bottom && i.x >= left && i.x < right)
            .cloned()
            .collect();
        group_into_lines(&region_items)
            .iter()
            .map(|l| l.text())
            .collect()
    }

    /// Top coordinate of the first text line matching `pattern`.
    pub fn find_line_top(&self, pattern: &Regex) -> Option<f32> {
        group_into_lines(&self.items)
            .iter()
            .find(|l| pattern.is_match(&l.text()))
            .map(|l| l.top)
    }

    /// Top coordinates of every text line matching `pattern`, top to bottom.
    pub fn find_all_line_tops(&self, pattern: &Regex) -> Vec<f32> {
        group_into_lines(&self.items)
            .iter()
            .filter(|l| pattern.is_match(&l.text()))
            .map(|l| l.top)
            .collect()
    }
}

/// Group text items into lines by vertical proximity.
///
/// Items are sorted geometrically (top, then x) before grouping. TLF pages
/// are single-column layouts whose stream order is often emission order, not
/// reading order, so geometric order is the one the segmenter can trust.
pub fn group_into_lines(items: &[TextItem]) -> Vec<TextLine> {
    if items.is_empty() {
        return Vec::new();
    }

    let mut sorted: Vec<TextItem> = items.to_vec();
    sorted.sort_by(|a, b| {
        a.top
            .partial_cmp(&b.top)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
    });

    let y_tolerance = 3.0;
    let mut lines: Vec<TextLine> = Vec::new();

    for item in sorted {
        let same_line = lines
            .last()
            .map_or(false, |last| (last.top - item.top).abs() < y_tolerance);

        if same_line {
            lines.last_mut().unwrap().items.push(item);
        } else {
            let top = item.top;
            lines.push(TextLine {
                items: vec![item],
                top,
            });
        }
    }

    // Grouping can pull in an item slightly above the line seed; items within
    // a line are already x-sorted by the global sort except in that case.
    for line in &mut lines {
        line.items
            .sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));
    }

    lines
}

/// Page width/height from the (possibly inherited) MediaBox.
fn page_dimensions(doc: &Document, page_id: ObjectId) -> (f32, f32) {
    // US Letter fallback
    let default = (612.0, 792.0);

    let Some(media_box) = inherited_media_box(doc, page_id) else {
        return default;
    };
    let w = media_box[2] - media_box[0];
    let h = media_box[3] - media_box[1];
    if w > 0.0 && h > 0.0 {
        (w, h)
    } else {
        default
    }
}

/// Walk the page's Parent chain for a MediaBox entry.
fn inherited_media_box(doc: &Document, page_id: ObjectId) -> Option<[f32; 4]> {
    let mut current = page_id;
    // Bounded walk in case of a malformed circular page tree
    for _ in 0..32 {
        let dict = doc.get_object(current).ok()?.as_dict().ok()?;
        if let Ok(obj) = dict.get(b"MediaBox") {
            let resolved = match obj {
                Object::Reference(id) => doc.get_object(*id).ok()?,
                other => other,
            };
            let arr = resolved.as_array().ok()?;
            if arr.len() == 4 {
                let mut out = [0.0f32; 4];
                for (i, v) in arr.iter().enumerate() {
                    out[i] = get_number(v)?;
                }
                return Some(out);
            }
        }
        match dict.get(b"Parent").and_then(|p| p.as_reference()) {
            Ok(parent) => current = parent,
            Err(_) => return None,
        }
    }
    None
}

/// Multiply two 2D transformation matrices
/// Matrix format: [a, b, c, d, e, f] representing:
/// | a  b  0 |
/// | c  d  0 |
/// | e  f  1 |
fn multiply_matrices(m1: &[f32; 6], m2: &[f32; 6]) -> [f32; 6] {
    [
        m1[0] * m2[0] + m1[1] * m2[2],
        m1[0] * m2[1] + m1[1] * m2[3],
        m1[2] * m2[0] + m1[3] * m2[2],
        m1[2] * m2[1] + m1[3] * m2[3],
        m1[4] * m2[0] + m1[5] * m2[2] + m2[4],
        m1[4] * m2[1] + m1[5] * m2[3] + m2[5],
    ]
}

/// Transform a point through a matrix.
fn transform_point(m: &[f32; 6], x: f32, y: f32) -> (f32, f32) {
    (m[0] * x + m[2] * y + m[4], m[1] * x + m[3] * y + m[5])
}

/// Compute effective font size from base size and text matrix
fn effective_font_size(base_size: f32, text_matrix: &[f32; 6]) -> f32 {
    let scale_x = (text_matrix[0].powi(2) + text_matrix[1].powi(2)).sqrt();
    let scale_y = (text_matrix[2].powi(2) + text_matrix[3].powi(2)).sqrt();
    let scale = scale_x.max(scale_y);
    base_size * scale
}

/// Walk a page's content stream collecting positioned text and drawn rules.
fn interpret_content(
    doc: &Document,
    page_id: ObjectId,
    page_height: f32,
) -> Result<(Vec<TextItem>, Vec<RuleLine>), ExtractError> {
    use lopdf::content::Content;

    let fonts = doc.get_page_fonts(page_id).unwrap_or_default();

    let content_data = doc
        .get_page_content(page_id)
        .map_err(|e| ExtractError::Parse(e.to_string()))?;
    let content = Content::decode(&content_data).map_err(|e| ExtractError::Parse(e.to_string()))?;

    let mut items = Vec::new();
    let mut rules = Vec::new();

    // Graphics state tracking
    let mut ctm = [1.0f32, 0.0, 0.0, 1.0, 0.0, 0.0];
    let mut ctm_stack: Vec<[f32; 6]> = Vec::new();

    // Text state tracking
    let mut current_font = String::new();
    let mut current_font_size: f32 = 12.0;
    let mut text_matrix = [1.0f32, 0.0, 0.0, 1.0, 0.0, 0.0];
    let mut line_matrix = [1.0f32, 0.0, 0.0, 1.0, 0.0, 0.0];
    let mut in_text_block = false;

    // Current path, as device-space segments and rectangles
    let mut path_start: Option<(f32, f32)> = None;
    let mut current_point: Option<(f32, f32)> = None;
    let mut path_segments: Vec<((f32, f32), (f32, f32))> = Vec::new();
    let mut path_rects: Vec<[f32; 4]> = Vec::new();

    let mut push_text = |text: String, text_matrix: &[f32; 6], ctm: &[f32; 6], size: f32| {
        if text.trim().is_empty() {
            return;
        }
        let combined = multiply_matrices(text_matrix, ctm);
        let (x, y) = (combined[4], combined[5]);
        let rendered_size = effective_font_size(size, text_matrix);
        items.push(TextItem {
            text,
            x,
            top: page_height - y,
            height: rendered_size,
            font_size: rendered_size,
        });
    };

    for op in &content.operations {
        match op.operator.as_str() {
            "q" => {
                ctm_stack.push(ctm);
            }
            "Q" => {
                if let Some(saved) = ctm_stack.pop() {
                    ctm = saved;
                }
            }
            "cm" => {
                if op.operands.len() >= 6 {
                    let new_matrix = [
                        get_number(&op.operands[0]).unwrap_or(1.0),
                        get_number(&op.operands[1]).unwrap_or(0.0),
                        get_number(&op.operands[2]).unwrap_or(0.0),
                        get_number(&op.operands[3]).unwrap_or(1.0),
                        get_number(&op.operands[4]).unwrap_or(0.0),
                        get_number(&op.operands[5]).unwrap_or(0.0),
                    ];
                    ctm = multiply_matrices(&new_matrix, &ctm);
                }
            }
            "BT" => {
                in_text_block = true;
                text_matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];
                line_matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];
            }
            "ET" => {
                in_text_block = false;
            }
            "Tf" => {
                if op.operands.len() >= 2 {
                    if let Ok(name) = op.operands[0].as_name() {
                        current_font = String::from_utf8_lossy(name).to_string();
                    }
                    if let Some(size) = get_number(&op.operands[1]) {
                        current_font_size = size;
                    }
                }
            }
            "Td" | "TD" => {
                if op.operands.len() >= 2 {
                    let tx = get_number(&op.operands[0]).unwrap_or(0.0);
                    let ty = get_number(&op.operands[1]).unwrap_or(0.0);
                    let translate = [1.0, 0.0, 0.0, 1.0, tx, ty];
                    line_matrix = multiply_matrices(&translate, &line_matrix);
                    text_matrix = line_matrix;
                }
            }
            "Tm" => {
                if op.operands.len() >= 6 {
                    for (i, operand) in op.operands.iter().take(6).enumerate() {
                        text_matrix[i] =
                            get_number(operand).unwrap_or(if i == 0 || i == 3 { 1.0 } else { 0.0 });
                    }
                    line_matrix = text_matrix;
                }
            }
            "T*" => {
                // Approximate line height
                let translate = [1.0, 0.0, 0.0, 1.0, 0.0, -current_font_size * 1.2];
                line_matrix = multiply_matrices(&translate, &line_matrix);
                text_matrix = line_matrix;
            }
            "Tj" => {
                if in_text_block && !op.operands.is_empty() {
                    if let Some(text) =
                        extract_text_from_operand(&op.operands[0], doc, &fonts, &current_font)
                    {
                        push_text(text, &text_matrix, &ctm, current_font_size);
                    }
                }
            }
            "TJ" => {
                if in_text_block && !op.operands.is_empty() {
                    if let Ok(array) = op.operands[0].as_array() {
                        let mut combined_text = String::new();
                        for item in array {
                            if let Some(text) =
                                extract_text_from_operand(item, doc, &fonts, &current_font)
                            {
                                combined_text.push_str(&text);
                            }
                        }
                        push_text(combined_text, &text_matrix, &ctm, current_font_size);
                    }
                }
            }
            "'" => {
                let translate = [1.0, 0.0, 0.0, 1.0, 0.0, -current_font_size * 1.2];
                line_matrix = multiply_matrices(&translate, &line_matrix);
                text_matrix = line_matrix;
                if !op.operands.is_empty() {
                    if let Some(text) =
                        extract_text_from_operand(&op.operands[0], doc, &fonts, &current_font)
                    {
                        push_text(text, &text_matrix, &ctm, current_font_size);
                    }
                }
            }
            // Path construction
            "m" => {
                if op.operands.len() >= 2 {
                    let x = get_number(&op.operands[0]).unwrap_or(0.0);
                    let y = get_number(&op.operands[1]).unwrap_or(0.0);
                    let p = transform_point(&ctm, x, y);
                    path_start = Some(p);
                    current_point = Some(p);
                }
            }
            "l" => {
                if op.operands.len() >= 2 {
                    let x = get_number(&op.operands[0]).unwrap_or(0.0);
                    let y = get_number(&op.operands[1]).unwrap_or(0.0);
                    let p = transform_point(&ctm, x, y);
                    if let Some(from) = current_point {
                        path_segments.push((from, p));
                    }
                    current_point = Some(p);
                }
            }
            // Curves move the current point but never draw separator rules
            "c" | "v" | "y" => {
                if op.operands.len() >= 2 {
                    let n = op.operands.len();
                    let x = get_number(&op.operands[n - 2]).unwrap_or(0.0);
                    let y = get_number(&op.operands[n - 1]).unwrap_or(0.0);
                    current_point = Some(transform_point(&ctm, x, y));
                }
            }
            "h" => {
                if let (Some(from), Some(start)) = (current_point, path_start) {
                    path_segments.push((from, start));
                    current_point = Some(start);
                }
            }
            "re" => {
                if op.operands.len() >= 4 {
                    let x = get_number(&op.operands[0]).unwrap_or(0.0);
                    let y = get_number(&op.operands[1]).unwrap_or(0.0);
                    let w = get_number(&op.operands[2]).unwrap_or(0.0);
                    let h = get_number(&op.operands[3]).unwrap_or(0.0);
                    let (x0, y0) = transform_point(&ctm, x, y);
                    let (x1, y1) = transform_point(&ctm, x + w, y + h);
                    path_rects.push([x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)]);
                    current_point = Some((x, y));
                }
            }
            // Path painting: harvest horizontal rules, then drop the path
            "S" | "s" | "f" | "F" | "f*" | "B" | "B*" | "b" | "b*" | "n" => {
                if op.operator != "n" {
                    collect_rules(&path_segments, &path_rects, page_height, &mut rules);
                }
                path_segments.clear();
                path_rects.clear();
                path_start = None;
                current_point = None;
            }
            _ => {}
        }
    }

    Ok((items, rules))
}

/// Keep the horizontal segments and thin rectangles of a painted path.
fn collect_rules(
    segments: &[((f32, f32), (f32, f32))],
    rects: &[[f32; 4]],
    page_height: f32,
    rules: &mut Vec<RuleLine>,
) {
    for &((x0, y0), (x1, y1)) in segments {
        if (y0 - y1).abs() < HORIZONTAL_EPSILON && (x1 - x0).abs() > 0.0 {
            rules.push(RuleLine {
                y: page_height - (y0 + y1) / 2.0,
                x0: x0.min(x1),
                x1: x0.max(x1),
            });
        }
    }
    for &[x0, y0, x1, y1] in rects {
        if (y1 - y0) < RULE_RECT_MAX_HEIGHT && (x1 - x0) > 0.0 {
            rules.push(RuleLine {
                y: page_height - (y0 + y1) / 2.0,
                x0,
                x1,
            });
        }
    }
}

/// Drop cell borders and underlines: a separator rule spans a meaningful
/// share of the page width.
pub fn filter_separator_rules(rules: &[RuleLine], page_width: f32) -> Vec<RuleLine> {
    let min_span = page_width * RULE_MIN_SPAN_FRACTION;
    rules
        .iter()
        .filter(|r| (r.x1 - r.x0) >= min_span)
        .copied()
        .collect()
}

/// Helper to get f32 from Object
fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Extract text from a text operand, handling encoding
fn extract_text_from_operand(
    obj: &Object,
    doc: &Document,
    fonts: &std::collections::BTreeMap<Vec<u8>, &lopdf::Dictionary>,
    current_font: &str,
) -> Option<String> {
    if let Object::String(bytes, _) = obj {
        // Try to decode using font encoding
        if let Some(font_dict) = fonts.get(current_font.as_bytes()) {
            if let Ok(encoding) = font_dict.get_font_encoding(doc) {
                if let Ok(text) = Document::decode_text(&encoding, bytes) {
                    return Some(text);
                }
            }
        }

        // Fallback: try UTF-16BE then Latin-1
        if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
            let utf16: Vec<u16> = bytes[2..]
                .chunks_exact(2)
                .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
                .collect();
            return Some(String::from_utf16_lossy(&utf16));
        }

        // Latin-1 fallback
        Some(bytes.iter().map(|&b| b as char).collect())
    } else {
        None
    }
}
