use std::collections::{HashMap, VecDeque};

// neighbours on opposite sides of a seed point in the opposite direction
const OPPOSITE_COS: f32 = -0.9;
// the two lattice axes at a seed must not be close to parallel
const PARALLEL_COS: f32 = 0.7;
// search radius around a predicted position, relative to the lattice step
const SEARCH_RADIUS: f32 = 0.3;
const MIN_SEARCH_RADIUS: f32 = 2.0;

type Vec2 = [f32; 2];

fn sub(a: Vec2, b: Vec2) -> Vec2 {
    [a[0] - b[0], a[1] - b[1]]
}

fn norm(a: Vec2) -> f32 {
    a[0].hypot(a[1])
}

fn cosine(a: Vec2, b: Vec2) -> f32 {
    let n = norm(a) * norm(b);
    if n > 0.0 {
        (a[0] * b[0] + a[1] * b[1]) / n
    } else {
        1.0
    }
}

// lattice axes around a seed: the seed's four nearest neighbours must form two pairs of
// opposite points. Returns the half-difference axes and the neighbours as
// (+u, -u, +v, -v).
fn seed_axes(points: &[Vec2], seed: usize) -> Option<(Vec2, Vec2, [usize; 4])> {
    if points.len() < 5 {
        return None;
    }

    let mut by_distance = points
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != seed)
        .map(|(i, p)| (norm(sub(*p, points[seed])), i))
        .collect::<Vec<_>>();
    by_distance.sort_by(|a, b| a.0.total_cmp(&b.0));

    let nn = [
        by_distance[0].1,
        by_distance[1].1,
        by_distance[2].1,
        by_distance[3].1,
    ];
    let v = nn.map(|i| sub(points[i], points[seed]));

    let opposite = (1..4).min_by(|&a, &b| cosine(v[0], v[a]).total_cmp(&cosine(v[0], v[b])))?;
    if cosine(v[0], v[opposite]) >= OPPOSITE_COS {
        return None;
    }

    let mut rest = (1..4).filter(|&k| k != opposite);
    let (k, l) = (rest.next()?, rest.next()?);
    if cosine(v[k], v[l]) >= OPPOSITE_COS {
        return None;
    }

    let axis_u = [(v[0][0] - v[opposite][0]) / 2.0, (v[0][1] - v[opposite][1]) / 2.0];
    let axis_v = [(v[k][0] - v[l][0]) / 2.0, (v[k][1] - v[l][1]) / 2.0];
    if cosine(axis_u, axis_v).abs() >= PARALLEL_COS {
        return None;
    }

    Some((axis_u, axis_v, [nn[0], nn[opposite], nn[k], nn[l]]))
}

// A connected set of candidates indexed by their lattice coordinates.
struct Lattice<'a> {
    points: &'a [Vec2],
    nodes: HashMap<(i32, i32), usize>,
    axes: [Vec2; 2],
}

impl Lattice<'_> {
    fn point(&self, node: (i32, i32)) -> Option<Vec2> {
        self.nodes.get(&node).map(|&i| self.points[i])
    }

    // expected displacement when stepping from `node` along `dir`, taken from the
    // closest already placed neighbours so that perspective is followed
    fn predict_step(&self, node: (i32, i32), dir: (i32, i32)) -> Vec2 {
        let (i, j) = node;
        if let (Some(p), Some(prev)) = (self.point(node), self.point((i - dir.0, j - dir.1))) {
            return sub(p, prev);
        }

        for side in [(dir.1, dir.0), (-dir.1, -dir.0)] {
            let q = (i + side.0, j + side.1);
            let Some(pq) = self.point(q) else {
                continue;
            };
            if let Some(forward) = self.point((q.0 + dir.0, q.1 + dir.1)) {
                return sub(forward, pq);
            }
            if let Some(back) = self.point((q.0 - dir.0, q.1 - dir.1)) {
                return sub(pq, back);
            }
        }

        let [u, v] = self.axes;
        match dir {
            (1, 0) => u,
            (-1, 0) => [-u[0], -u[1]],
            (0, 1) => v,
            _ => [-v[0], -v[1]],
        }
    }

    fn bounds(&self) -> ((i32, i32), (i32, i32)) {
        let (mut min, mut max) = ((i32::MAX, i32::MAX), (i32::MIN, i32::MIN));
        for &(i, j) in self.nodes.keys() {
            min = (min.0.min(i), min.1.min(j));
            max = (max.0.max(i), max.1.max(j));
        }
        (min, max)
    }
}

fn grow_lattice<'a>(points: &'a [Vec2], seed: usize) -> Option<Lattice<'a>> {
    let (axis_u, axis_v, nn) = seed_axes(points, seed)?;

    let mut lattice = Lattice {
        points,
        nodes: HashMap::new(),
        axes: [axis_u, axis_v],
    };
    let mut used = vec![false; points.len()];
    let mut queue = VecDeque::new();

    for (node, idx) in [
        ((0, 0), seed),
        ((1, 0), nn[0]),
        ((-1, 0), nn[1]),
        ((0, 1), nn[2]),
        ((0, -1), nn[3]),
    ] {
        lattice.nodes.insert(node, idx);
        used[idx] = true;
        queue.push_back(node);
    }

    while let Some(node) = queue.pop_front() {
        let Some(origin) = lattice.point(node) else {
            continue;
        };
        for dir in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
            let target = (node.0 + dir.0, node.1 + dir.1);
            if lattice.nodes.contains_key(&target) {
                continue;
            }

            let step = lattice.predict_step(node, dir);
            let predicted = [origin[0] + step[0], origin[1] + step[1]];
            let radius = (SEARCH_RADIUS * norm(step)).max(MIN_SEARCH_RADIUS);

            let best = points
                .iter()
                .enumerate()
                .filter(|(i, _)| !used[*i])
                .map(|(i, p)| (norm(sub(*p, predicted)), i))
                .filter(|(d, _)| *d < radius)
                .min_by(|a, b| a.0.total_cmp(&b.0));

            if let Some((_, idx)) = best {
                lattice.nodes.insert(target, idx);
                used[idx] = true;
                queue.push_back(target);
            }
        }
    }

    Some(lattice)
}

// Read the lattice as rows of `width` points, choosing the orientation whose first point
// is closest to the image origin.
fn ordered_corners(lattice: &Lattice, width: usize, height: usize) -> Option<Vec<Vec2>> {
    let ((i0, j0), (i1, j1)) = lattice.bounds();
    let (span_i, span_j) = ((i1 - i0 + 1) as usize, (j1 - j0 + 1) as usize);
    let transposed = match (span_i, span_j) {
        (w, h) if w == width && h == height => false,
        (w, h) if w == height && h == width => true,
        _ => return None,
    };

    let mut rows = Vec::with_capacity(height);
    for r in 0..height as i32 {
        let mut row = Vec::with_capacity(width);
        for c in 0..width as i32 {
            let node = if transposed {
                (i0 + r, j0 + c)
            } else {
                (i0 + c, j0 + r)
            };
            row.push(lattice.point(node)?);
        }
        rows.push(row);
    }

    let flip = |reverse_cols: bool, reverse_rows: bool| {
        let mut out = rows.clone();
        if reverse_rows {
            out.reverse();
        }
        if reverse_cols {
            out.iter_mut().for_each(|row| row.reverse());
        }
        out.concat()
    };

    [(false, false), (true, false), (false, true), (true, true)]
        .into_iter()
        .map(|(c, r)| flip(c, r))
        .min_by(|a, b| (a[0][0] + a[0][1]).total_cmp(&(b[0][0] + b[0][1])))
}

/// Organise corner candidates into a `width x height` lattice.
///
/// Seeds are tried in the order of `points` (strongest candidates first), at most
/// `max_seeds` of them. From each seed the lattice is grown breadth first, predicting the
/// position of the next corner from its already placed neighbours. A lattice is accepted
/// only when it holds exactly `width * height` points spanning the pattern size.
///
/// # Returns
///
/// The corners in row-major order with `width` corners per row, or `None` if no seed
/// produced a complete lattice.
pub fn assemble_grid(
    points: &[[f32; 2]],
    width: usize,
    height: usize,
    max_seeds: usize,
) -> Option<Vec<[f32; 2]>> {
    let expected = width * height;
    if points.len() < expected {
        return None;
    }

    let mut tried = 0;
    for seed in 0..points.len() {
        if tried >= max_seeds {
            break;
        }
        let Some(lattice) = grow_lattice(points, seed) else {
            continue;
        };
        tried += 1;

        log::trace!("seed {} grew {} nodes", seed, lattice.nodes.len());

        if lattice.nodes.len() != expected {
            continue;
        }
        if let Some(corners) = ordered_corners(&lattice, width, height) {
            return Some(corners);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::assemble_grid;

    // slightly sheared lattice, listed from its centre outwards
    fn lattice(width: usize, height: usize) -> Vec<[f32; 2]> {
        let mut points = Vec::new();
        for j in 0..height {
            for i in 0..width {
                let (x, y) = (i as f32, j as f32);
                points.push([40.0 + 30.0 * x + 3.0 * y, 25.0 + 2.0 * x + 28.0 * y]);
            }
        }
        let (cx, cy) = (points[width * height / 2][0], points[width * height / 2][1]);
        points.sort_by(|a, b| {
            let da = (a[0] - cx).hypot(a[1] - cy);
            let db = (b[0] - cx).hypot(b[1] - cy);
            da.total_cmp(&db)
        });
        points
    }

    #[test]
    fn test_assemble_row_major() {
        let points = lattice(7, 5);
        let corners = assemble_grid(&points, 7, 5, 10);

        let corners = corners.unwrap_or_default();
        assert_eq!(corners.len(), 35);
        assert_eq!(corners[0], [40.0, 25.0]);
        assert_eq!(corners[1], [70.0, 27.0]);
        assert_eq!(corners[7], [43.0, 53.0]);
    }

    #[test]
    fn test_assemble_transposed_pattern() {
        // a board lying on its side: 5 columns, 7 rows in the image
        let points = lattice(5, 7);
        let corners = assemble_grid(&points, 7, 5, 10).unwrap_or_default();

        assert_eq!(corners.len(), 35);
        assert_eq!(corners[0], [40.0, 25.0]);
        // rows run along the longer side
        assert_eq!(corners[1], [43.0, 53.0]);
    }

    #[test]
    fn test_incomplete_lattice_is_rejected() {
        let mut points = lattice(7, 5);
        points.pop();
        assert!(assemble_grid(&points, 7, 5, 10).is_none());

        // right number of points, wrong shape
        let points = lattice(5, 5);
        assert!(assemble_grid(&points, 7, 5, 10).is_none());
    }

    #[test]
    fn test_extra_outlier_is_ignored() {
        let mut points = lattice(7, 5);
        points.push([500.0, 500.0]);
        let corners = assemble_grid(&points, 7, 5, 10).unwrap_or_default();
        assert_eq!(corners.len(), 35);
    }
}
