//! Content stream walk producing positioned text runs
//!
//! Tracks just enough of the text state (text matrix, line matrix, font size,
//! leading) to place each text-showing operation on the page. There are no
//! font metrics here: a glyph is taken to be half an em wide, which is close
//! enough for highlight boxes.

use lopdf::content::Content;
use lopdf::{Document, Object, ObjectId};
use shared_types::TextRun;

/// Estimated glyph advance as a fraction of the font size
const GLYPH_WIDTH_EM: f64 = 0.5;

/// Affine matrix `[a b c d e f]` as used by PDF
type Matrix = [f64; 6];

const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

#[derive(Debug)]
struct TextState {
    text_matrix: Matrix,
    line_matrix: Matrix,
    font_size: f64,
    leading: f64,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            text_matrix: IDENTITY,
            line_matrix: IDENTITY,
            font_size: 0.0,
            leading: 0.0,
        }
    }
}

impl TextState {
    fn begin_text(&mut self) {
        self.text_matrix = IDENTITY;
        self.line_matrix = IDENTITY;
    }

    /// `Td`: move to the start of the next line, offset from the current one
    fn move_line(&mut self, tx: f64, ty: f64) {
        let [a, b, c, d, e, f] = self.line_matrix;
        self.line_matrix = [a, b, c, d, e + tx * a + ty * c, f + tx * b + ty * d];
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        self.move_line(0.0, -self.leading);
    }

    fn set_matrix(&mut self, m: Matrix) {
        self.text_matrix = m;
        self.line_matrix = m;
    }

    /// Rendered font size, including any scaling in the text matrix
    fn effective_size(&self) -> f64 {
        let [_, _, c, d, _, _] = self.text_matrix;
        let scale = (c * c + d * d).sqrt();
        self.font_size.abs() * if scale > 0.0 { scale } else { 1.0 }
    }

    /// Emit a run for `text` at the current position and advance past it
    fn show(&mut self, text: String, runs: &mut Vec<TextRun>) {
        let glyphs = text.chars().count() as f64;
        let [a, b, _, _, e, f] = self.text_matrix;
        let x_scale = (a * a + b * b).sqrt();
        let advance = glyphs * self.font_size.abs() * GLYPH_WIDTH_EM;
        let width = advance * if x_scale > 0.0 { x_scale } else { 1.0 };

        if !text.trim().is_empty() {
            let size = self.effective_size();
            runs.push(TextRun::new(
                text,
                e,
                f,
                width,
                (size > 0.0).then_some(size),
            ));
        }

        self.text_matrix[4] += advance * a;
        self.text_matrix[5] += advance * b;
    }
}

/// Walk one page's content stream and return its text runs in stream order
pub fn extract_runs(doc: &Document, page_id: ObjectId) -> Result<Vec<TextRun>, String> {
    let content = doc.get_page_content(page_id).map_err(|e| e.to_string())?;
    let content = Content::decode(&content).map_err(|e| e.to_string())?;

    let mut state = TextState::default();
    let mut runs = Vec::new();

    for op in content.operations {
        let operands = &op.operands;
        match op.operator.as_str() {
            "BT" => state.begin_text(),
            "Tf" => {
                if let Some(size) = operands.get(1).and_then(number) {
                    state.font_size = size;
                }
            }
            "TL" => {
                if let Some(leading) = operands.first().and_then(number) {
                    state.leading = leading;
                }
            }
            "Td" | "TD" => {
                if let [tx, ty] = numbers(operands).as_slice() {
                    if op.operator == "TD" {
                        state.leading = -ty;
                    }
                    state.move_line(*tx, *ty);
                }
            }
            "Tm" => {
                if let Ok(m) = <Matrix>::try_from(numbers(operands).as_slice()) {
                    state.set_matrix(m);
                }
            }
            "T*" => state.next_line(),
            "Tj" | "TJ" => {
                if let Some(text) = operands.first().and_then(extract_text_from_operand) {
                    state.show(text, &mut runs);
                }
            }
            "'" => {
                state.next_line();
                if let Some(text) = operands.first().and_then(extract_text_from_operand) {
                    state.show(text, &mut runs);
                }
            }
            "\"" => {
                state.next_line();
                if let Some(text) = operands.get(2).and_then(extract_text_from_operand) {
                    state.show(text, &mut runs);
                }
            }
            _ => {}
        }
    }

    Ok(runs)
}

fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

fn numbers(operands: &[Object]) -> Vec<f64> {
    operands.iter().filter_map(number).collect()
}

/// Decode a string operand: UTF-8, then UTF-16BE with BOM, then Latin-1.
/// In `TJ` arrays a large negative adjustment reads as a word gap.
fn extract_text_from_operand(operand: &Object) -> Option<String> {
    match operand {
        Object::String(bytes, _) => Some(decode_pdf_string(bytes)),
        Object::Array(items) => {
            let mut text = String::new();
            for item in items {
                match item {
                    Object::String(bytes, _) => text.push_str(&decode_pdf_string(bytes)),
                    Object::Integer(n) if *n < -100 => text.push(' '),
                    Object::Real(n) if (*n as f64) < -100.0 => text.push(' '),
                    _ => {}
                }
            }
            Some(text)
        }
        _ => None,
    }
}

fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        if let Ok(s) = String::from_utf16(&units) {
            return s;
        }
    }
    bytes.iter().map(|&b| b as char).collect()
}

/// Page size from the MediaBox, US Letter when absent
pub fn page_dimensions(doc: &Document, page_id: ObjectId) -> (f64, f64) {
    doc.get_object(page_id)
        .and_then(Object::as_dict)
        .and_then(|dict| dict.get(b"MediaBox"))
        .and_then(Object::as_array)
        .ok()
        .filter(|arr| arr.len() >= 4)
        .map(|arr| {
            let width = number(&arr[2]).unwrap_or(612.0) - number(&arr[0]).unwrap_or(0.0);
            let height = number(&arr[3]).unwrap_or(792.0) - number(&arr[1]).unwrap_or(0.0);
            (width, height)
        })
        .unwrap_or((612.0, 792.0))
}
