use crate::formats::GameRecord;
use crate::impose::{LayoutConfig, Sheet, Slot};

const MARK_STROKE_MM: f64 = 0.25;

/// One printable HTML document for `sheets`: a page-sized `section` per sheet,
/// cards placed absolutely from their cell geometry, crop marks drawn in an SVG
/// overlay spanning the page.
pub fn render_sheets(sheets: &[Sheet], config: &LayoutConfig) -> String {
    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n");
    out.push_str("<html lang=\"en\">\n");
    out.push_str("<head>\n");
    out.push_str("  <meta charset=\"utf-8\" />\n");
    out.push_str("  <title>bggdeck print sheets</title>\n");
    out.push_str("  <style>\n");
    out.push_str(&stylesheet(config));
    out.push_str("  </style>\n");
    out.push_str("</head>\n");
    out.push_str("<body>\n");
    for sheet in sheets {
        render_sheet(&mut out, sheet, sheets.len());
    }
    out.push_str("</body>\n");
    out.push_str("</html>\n");
    out
}

fn stylesheet(config: &LayoutConfig) -> String {
    let bleed = config.effective_bleed();
    let mut css = String::new();
    css.push_str(&format!(
        "    @page {{ size: {}mm {}mm; margin: 0; }}\n",
        mm(config.page_width_mm),
        mm(config.page_height_mm)
    ));
    css.push_str("    * { box-sizing: border-box; }\n");
    css.push_str("    html, body { margin: 0; padding: 0; font-family: sans-serif; }\n");
    css.push_str(&format!(
        "    .sheet {{ position: relative; width: {}mm; height: {}mm; overflow: hidden; page-break-after: always; break-after: page; }}\n",
        mm(config.page_width_mm),
        mm(config.page_height_mm)
    ));
    css.push_str("    .sheet:last-child { page-break-after: auto; break-after: auto; }\n");
    css.push_str("    .card { position: absolute; overflow: hidden; background: #f4efe6; }\n");
    css.push_str(&format!(
        "    .face {{ position: absolute; left: {b}mm; top: {b}mm; right: {b}mm; bottom: {b}mm; display: flex; flex-direction: column; padding: 3mm; font-size: 7pt; line-height: 1.25; }}\n",
        b = mm(bleed)
    ));
    css.push_str("    .art { height: 38%; background: #d8d0c0 center / cover no-repeat; display: flex; align-items: center; justify-content: center; color: #7a7060; }\n");
    css.push_str("    .name { font-size: 10pt; font-weight: bold; margin: 1.5mm 0 0; }\n");
    css.push_str("    .year { color: #555; }\n");
    css.push_str("    .stats { display: flex; justify-content: space-between; border-top: 0.2mm solid #999; border-bottom: 0.2mm solid #999; margin: 1mm 0; padding: 0.5mm 0; }\n");
    css.push_str("    .description { flex: 1; overflow: hidden; }\n");
    css.push_str("    .credits { font-size: 6pt; color: #333; }\n");
    css.push_str("    .marks { position: absolute; left: 0; top: 0; }\n");
    css.push_str("    .footer { position: absolute; left: 0; right: 0; bottom: 2mm; text-align: center; font-size: 6pt; color: #777; }\n");
    css
}

fn render_sheet(out: &mut String, sheet: &Sheet, total: usize) {
    out.push_str(&format!(
        "<section class=\"sheet\" data-sheet=\"{}\">\n",
        sheet.index + 1
    ));
    for slot in &sheet.slots {
        render_card(out, slot);
    }
    render_crop_marks(out, sheet);
    out.push_str(&format!(
        "  <div class=\"footer\">bggdeck - sheet {} of {} - {} cards</div>\n",
        sheet.index + 1,
        total,
        sheet.slots.len()
    ));
    out.push_str("</section>\n");
}

fn render_card(out: &mut String, slot: &Slot) {
    let record = &slot.record;
    let cell = slot.geometry.cell;
    out.push_str(&format!(
        "  <article class=\"card\" data-id=\"{}\" style=\"left: {}mm; top: {}mm; width: {}mm; height: {}mm;\">\n",
        html_escape(&record.id),
        mm(cell.x),
        mm(cell.y),
        mm(cell.width),
        mm(cell.height)
    ));
    out.push_str("    <div class=\"face\">\n");

    match record.image.as_deref() {
        Some(image) => out.push_str(&format!(
            "      <div class=\"art\" style=\"background-image: url('{}');\"></div>\n",
            html_escape(&css_url(image))
        )),
        None => out.push_str("      <div class=\"art\">No Image</div>\n"),
    }

    out.push_str(&format!(
        "      <h2 class=\"name\">{}</h2>\n",
        html_escape(&record.name)
    ));
    if let Some(year) = record.year_published {
        out.push_str(&format!("      <div class=\"year\">{year}</div>\n"));
    }

    out.push_str("      <div class=\"stats\">");
    out.push_str(&format!(
        "<span class=\"players\">{}</span>",
        players_label(record)
    ));
    out.push_str(&format!(
        "<span class=\"playtime\">{}</span>",
        playtime_label(record)
    ));
    out.push_str(&format!(
        "<span class=\"weight\">{}</span>",
        weight_label(record)
    ));
    out.push_str("</div>\n");

    out.push_str(&format!(
        "      <p class=\"description\">{}</p>\n",
        html_escape(
            record
                .description
                .as_deref()
                .unwrap_or("No description available.")
        )
    ));

    if !record.designers.is_empty() {
        out.push_str(&format!(
            "      <div class=\"credits\">Design: {}</div>\n",
            html_escape(&record.designers.join(", "))
        ));
    }
    if !record.artists.is_empty() {
        out.push_str(&format!(
            "      <div class=\"credits\">Art: {}</div>\n",
            html_escape(&record.artists.join(", "))
        ));
    }

    out.push_str("    </div>\n");
    out.push_str("  </article>\n");
}

fn render_crop_marks(out: &mut String, sheet: &Sheet) {
    if sheet.slots.iter().all(|slot| slot.crop_marks.is_empty()) {
        return;
    }

    out.push_str(&format!(
        "  <svg class=\"marks\" xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}mm\" height=\"{h}mm\" viewBox=\"0 0 {w} {h}\">\n",
        w = mm(sheet.page_width_mm),
        h = mm(sheet.page_height_mm)
    ));
    out.push_str(&format!(
        "    <g stroke=\"#000\" stroke-width=\"{}\" fill=\"none\">\n",
        mm(MARK_STROKE_MM)
    ));
    for mark in sheet.slots.iter().flat_map(|slot| &slot.crop_marks) {
        out.push_str(&format!(
            "      <line x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\" />\n",
            mm(mark.x1),
            mm(mark.y1),
            mm(mark.x2),
            mm(mark.y2)
        ));
    }
    out.push_str("    </g>\n");
    out.push_str("  </svg>\n");
}

/// `n` when min and max agree (or only one is known), `min-max` otherwise.
fn players_label(record: &GameRecord) -> String {
    match (record.min_players, record.max_players) {
        (Some(min), Some(max)) if min != max => format!("{min}-{max}"),
        (Some(n), _) | (None, Some(n)) => n.to_string(),
        (None, None) => "-".to_owned(),
    }
}

fn playtime_label(record: &GameRecord) -> String {
    record
        .playing_time_minutes
        .map(|minutes| format!("{minutes}m"))
        .unwrap_or_else(|| "-".to_owned())
}

fn weight_label(record: &GameRecord) -> String {
    record
        .complexity_weight
        .map(|weight| format!("{weight:.1}"))
        .unwrap_or_else(|| "-".to_owned())
}

/// Fixed-precision millimetres with trailing zeros trimmed.
fn mm(value: f64) -> String {
    let text = format!("{value:.3}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_owned()
    } else {
        text.to_owned()
    }
}

/// Percent-encodes the characters that could end a quoted CSS `url()`.
fn css_url(url: &str) -> String {
    let mut out = String::with_capacity(url.len());
    for ch in url.chars() {
        match ch {
            '\'' | '"' | '(' | ')' | '\\' => out.push_str(&format!("%{:02X}", ch as u32)),
            c if c.is_whitespace() || c.is_control() => {
                let mut buf = [0u8; 4];
                for byte in c.encode_utf8(&mut buf).bytes() {
                    out.push_str(&format!("%{byte:02X}"));
                }
            }
            c => out.push(c),
        }
    }
    out
}

fn html_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
