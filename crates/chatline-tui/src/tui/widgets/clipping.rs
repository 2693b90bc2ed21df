//! Drawing a row that is only partly inside the viewport
use ratatui::{buffer::Buffer, layout::Rect};

/// Draw a `full_height` row into a scratch buffer, then copy `area.height` of its lines
/// starting at `skip` into `area` of `buf`.
pub fn render_clipped(
    full_height: u16,
    skip: u16,
    area: Rect,
    buf: &mut Buffer,
    draw: impl FnOnce(Rect, &mut Buffer),
) {
    if skip == 0 && area.height >= full_height {
        draw(Rect { height: full_height, ..area }, buf);
        return;
    }

    let full_area = Rect {
        x: 0,
        y: 0,
        width: area.width,
        height: full_height,
    };
    let mut scratch = Buffer::empty(full_area);
    draw(full_area, &mut scratch);

    for dy in 0..area.height {
        let src_y = dy.saturating_add(skip);
        if src_y >= full_height {
            break;
        }
        for dx in 0..area.width {
            let Some(src) = scratch.cell((dx, src_y)) else {
                continue;
            };
            if let Some(dst) = buf.cell_mut((area.x + dx, area.y + dy)) {
                *dst = src.clone();
            }
        }
    }
}
