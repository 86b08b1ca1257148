use rayon::prelude::*;

use crate::Sim;

/// Cell grid overlay (#022330).
const OVERLAY: [u8; 4] = [0x02, 0x23, 0x30, 255];

/// Cells narrower than this are drawn without overlay lines.
const MIN_OVERLAY_CELL: usize = 4;

/// Render the sim as an RGBA buffer of `width*cell_size` x `height*cell_size` pixels.
/// Background follows the pause state; each dot fills its cell in its own colour.
pub fn render_frame(sim: &Sim, cell_size: u32) -> Vec<u8> {
    let cs = cell_size.max(1) as usize;
    let (gw, gh) = sim.grid().bounds();
    let pw = gw * cs;
    let ph = gh * cs;
    let bg = sim.background();

    // Per-cell colour from the index, O(live) instead of a full grid walk.
    let mut fill: Vec<Option<[u8; 4]>> = vec![None; gw * gh];
    for (p, color) in sim.live_positions() {
        fill[p.y as usize * gw + p.x as usize] = Some(color);
    }

    let mut rgba = vec![0u8; pw * ph * 4];
    rgba.par_chunks_mut(pw * 4).enumerate().for_each(|(py, row)| {
        let cy = py / cs;
        let h_line = cs >= MIN_OVERLAY_CELL && py % cs == 0;
        for px in 0..pw {
            let cx = px / cs;
            let v_line = cs >= MIN_OVERLAY_CELL && px % cs == 0;
            let color = if h_line || v_line {
                OVERLAY
            } else {
                fill[cy * gw + cx].unwrap_or(bg)
            };
            row[px * 4..px * 4 + 4].copy_from_slice(&color);
        }
    });

    rgba
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Params;
    use crate::entity::DOT_COLOR;
    use crate::point::Point;

    fn pixel(rgba: &[u8], pw: usize, x: usize, y: usize) -> [u8; 4] {
        let i = (y * pw + x) * 4;
        [rgba[i], rgba[i + 1], rgba[i + 2], rgba[i + 3]]
    }

    #[test]
    fn dots_fill_their_cells() {
        let mut sim = Sim::new(Params {
            width: 3,
            height: 2,
            ..Params::default()
        })
        .unwrap();
        sim.place(Point::new(2, 1)).unwrap();
        let rgba = render_frame(&sim, 8);
        let pw = 24;
        assert_eq!(rgba.len(), 24 * 16 * 4);
        assert_eq!(pixel(&rgba, pw, 20, 12), DOT_COLOR);
        assert_eq!(pixel(&rgba, pw, 4, 4), sim.background());
        assert_eq!(pixel(&rgba, pw, 16, 12), OVERLAY);
    }

    #[test]
    fn tiny_cells_skip_overlay() {
        let mut sim = Sim::new(Params {
            width: 2,
            height: 2,
            ..Params::default()
        })
        .unwrap();
        sim.place(Point::new(0, 0)).unwrap();
        let rgba = render_frame(&sim, 1);
        assert_eq!(rgba.len(), 2 * 2 * 4);
        assert_eq!(pixel(&rgba, 2, 0, 0), DOT_COLOR);
        assert_eq!(pixel(&rgba, 2, 1, 1), sim.background());
    }
}
