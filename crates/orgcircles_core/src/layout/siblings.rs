//! Front-chain packing of sibling circles.
//!
//! # Responsibility
//! - Place circles tangent to each other without overlap, each new circle
//!   touching two circles of the current front chain chosen to keep the
//!   pack compact.
//! - Re-center the pack on its enclosing circle.
//!
//! # Invariants
//! - Input radii are left unchanged; only `x`/`y` are written.
//! - The front chain is a cyclic doubly linked list over input indices.

use crate::layout::enclose::{enclose, Circle, Lcg};

/// Packs `circles` in place and returns the radius of their enclosing circle.
///
/// After the call the enclosing circle is centered at the origin.
pub fn pack_siblings(circles: &mut [Circle], random: &mut Lcg) -> f64 {
    let n = circles.len();
    if n == 0 {
        return 0.0;
    }

    circles[0].x = 0.0;
    circles[0].y = 0.0;
    if n == 1 {
        return circles[0].r;
    }

    let (ar, br) = (circles[0].r, circles[1].r);
    circles[0].x = -br;
    circles[1].x = ar;
    circles[1].y = 0.0;
    if n == 2 {
        return ar + br;
    }

    circles[2] = place(circles[1], circles[0], circles[2]);

    let mut next = vec![0usize; n];
    let mut prev = vec![0usize; n];
    link(&mut next, &mut prev, 0, 1);
    link(&mut next, &mut prev, 1, 2);
    link(&mut next, &mut prev, 2, 0);

    let (mut a, mut b) = (0usize, 1usize);
    let mut i = 3;
    'pack: while i < n {
        circles[i] = place(circles[a], circles[b], circles[i]);
        let c = i;

        // Walk the chain from both ends looking for the first circle the new
        // one overlaps; if found, drop the chain segment in between and retry.
        let (mut j, mut k) = (next[b], prev[a]);
        let (mut sj, mut sk) = (circles[b].r, circles[a].r);
        loop {
            if sj <= sk {
                if intersects(&circles[j], &circles[c]) {
                    b = j;
                    link(&mut next, &mut prev, a, b);
                    continue 'pack;
                }
                sj += circles[j].r;
                j = next[j];
            } else {
                if intersects(&circles[k], &circles[c]) {
                    a = k;
                    link(&mut next, &mut prev, a, b);
                    continue 'pack;
                }
                sk += circles[k].r;
                k = prev[k];
            }
            if j == next[k] {
                break;
            }
        }

        link(&mut next, &mut prev, a, c);
        link(&mut next, &mut prev, c, b);

        let mut best = score(circles, &next, a);
        let mut cursor = next[c];
        while cursor != c {
            let candidate = score(circles, &next, cursor);
            if candidate < best {
                a = cursor;
                best = candidate;
            }
            cursor = next[cursor];
        }
        b = next[a];
        i += 1;
    }

    let mut chain = vec![circles[b]];
    let mut cursor = next[b];
    while cursor != b {
        chain.push(circles[cursor]);
        cursor = next[cursor];
    }
    let Some(e) = enclose(&chain, random) else {
        return 0.0;
    };
    for circle in circles.iter_mut() {
        circle.x -= e.x;
        circle.y -= e.y;
    }
    e.r
}

fn link(next: &mut [usize], prev: &mut [usize], from: usize, to: usize) {
    next[from] = to;
    prev[to] = from;
}

/// Places `c` tangent to both `a` and `b`.
fn place(b: Circle, a: Circle, mut c: Circle) -> Circle {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let d2 = dx * dx + dy * dy;
    if d2 != 0.0 {
        let a2 = (a.r + c.r).powi(2);
        let b2 = (b.r + c.r).powi(2);
        if a2 > b2 {
            let x = (d2 + b2 - a2) / (2.0 * d2);
            let y = (b2 / d2 - x * x).max(0.0).sqrt();
            c.x = b.x - x * dx - y * dy;
            c.y = b.y - x * dy + y * dx;
        } else {
            let x = (d2 + a2 - b2) / (2.0 * d2);
            let y = (a2 / d2 - x * x).max(0.0).sqrt();
            c.x = a.x + x * dx - y * dy;
            c.y = a.y + x * dy + y * dx;
        }
    } else {
        c.x = a.x + c.r;
        c.y = a.y;
    }
    c
}

fn intersects(a: &Circle, b: &Circle) -> bool {
    let dr = a.r + b.r - 1e-6;
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    dr > 0.0 && dr * dr > dx * dx + dy * dy
}

/// Squared distance from the origin to the weighted midpoint of a chain link.
fn score(circles: &[Circle], next: &[usize], node: usize) -> f64 {
    let a = circles[node];
    let b = circles[next[node]];
    let ab = a.r + b.r;
    let dx = (a.x * b.r + b.x * a.r) / ab;
    let dy = (a.y * b.r + b.y * a.r) / ab;
    dx * dx + dy * dy
}
