//! Barnes-Hut quadtree for approximate long-range repulsion.

const MAX_DEPTH: u32 = 24;

#[derive(Clone, Debug)]
struct Cell {
	cx: f32,
	cy: f32,
	half: f32,
	mass: f32,
	mx: f32,
	my: f32,
	body: Option<usize>,
	children: Option<[usize; 4]>,
}

impl Cell {
	fn new(cx: f32, cy: f32, half: f32) -> Self {
		Self {
			cx,
			cy,
			half,
			mass: 0.0,
			mx: 0.0,
			my: 0.0,
			body: None,
			children: None,
		}
	}

	fn quadrant(&self, x: f32, y: f32) -> usize {
		(usize::from(x >= self.cx)) | (usize::from(y >= self.cy) << 1)
	}

	fn contains(&self, x: f32, y: f32) -> bool {
		(x - self.cx).abs() <= self.half && (y - self.cy).abs() <= self.half
	}

	fn centre_of_mass(&self) -> (f32, f32) {
		(self.mx / self.mass, self.my / self.mass)
	}
}

pub struct QuadTree<'a> {
	cells: Vec<Cell>,
	points: &'a [(f32, f32)],
	mass: f32,
	/// Force terms evaluated so far across all `repulsion` calls.
	#[cfg(test)]
	terms: std::cell::Cell<usize>,
}

impl<'a> QuadTree<'a> {
	/// Builds a tree over `points`, every body carrying the same `mass`.
	pub fn build(points: &'a [(f32, f32)], mass: f32) -> Self {
		let (mut min_x, mut min_y, mut max_x, mut max_y) = (f32::MAX, f32::MAX, f32::MIN, f32::MIN);
		for &(x, y) in points {
			min_x = min_x.min(x);
			min_y = min_y.min(y);
			max_x = max_x.max(x);
			max_y = max_y.max(y);
		}
		let half = ((max_x - min_x).max(max_y - min_y) / 2.0).max(1.0);
		let mut tree = Self {
			cells: vec![Cell::new((min_x + max_x) / 2.0, (min_y + max_y) / 2.0, half)],
			points,
			mass,
			#[cfg(test)]
			terms: std::cell::Cell::new(0),
		};
		if points.is_empty() {
			tree.cells[0] = Cell::new(0.0, 0.0, 1.0);
		}
		for idx in 0..points.len() {
			tree.insert(0, idx, 0);
		}
		tree
	}

	fn insert(&mut self, cell: usize, idx: usize, depth: u32) {
		let (x, y) = self.points[idx];
		{
			let c = &mut self.cells[cell];
			c.mass += self.mass;
			c.mx += x * self.mass;
			c.my += y * self.mass;
		}

		if let Some(children) = self.cells[cell].children {
			let q = self.cells[cell].quadrant(x, y);
			self.insert(children[q], idx, depth + 1);
			return;
		}
		let Some(resident) = self.cells[cell].body else {
			if self.cells[cell].mass <= self.mass {
				self.cells[cell].body = Some(idx);
			}
			return;
		};
		// Coincident points past the depth limit share the leaf as an aggregate.
		if depth >= MAX_DEPTH {
			self.cells[cell].body = None;
			return;
		}

		let children = self.split(cell);
		self.cells[cell].body = None;
		let (rx, ry) = self.points[resident];
		let rq = self.cells[cell].quadrant(rx, ry);
		self.insert(children[rq], resident, depth + 1);
		let q = self.cells[cell].quadrant(x, y);
		self.insert(children[q], idx, depth + 1);
	}

	fn split(&mut self, cell: usize) -> [usize; 4] {
		let Cell { cx, cy, half, .. } = self.cells[cell];
		let q = half / 2.0;
		let base = self.cells.len();
		for (dx, dy) in [(-q, -q), (q, -q), (-q, q), (q, q)] {
			self.cells.push(Cell::new(cx + dx, cy + dy, q));
		}
		let children = [base, base + 1, base + 2, base + 3];
		self.cells[cell].children = Some(children);
		children
	}

	/// Repulsive force on body `idx` from every other body.
	///
	/// Cells whose size over distance falls under `theta` are treated as a single mass
	/// at their centre of mass. Force magnitude is `charge * m1 * m2 / d^2`.
	pub fn repulsion(&self, idx: usize, theta: f32, charge: f32) -> (f32, f32) {
		let (px, py) = self.points[idx];
		let mut force = (0.0, 0.0);
		let mut stack = vec![0usize];
		while let Some(cell) = stack.pop() {
			let c = &self.cells[cell];
			if c.mass <= 0.0 || c.body == Some(idx) {
				continue;
			}
			let (mx, my) = c.centre_of_mass();
			let (dx, dy) = (px - mx, py - my);
			let dist_sq = dx * dx + dy * dy;
			let far = !c.contains(px, py) && c.half * 2.0 < theta * dist_sq.sqrt();
			match c.children {
				Some(children) if !far => stack.extend(children),
				_ => {
					if dist_sq < 1e-6 {
						continue;
					}
					#[cfg(test)]
					self.terms.set(self.terms.get() + 1);
					let dist = dist_sq.sqrt();
					let magnitude = charge * self.mass * c.mass / dist_sq;
					force.0 += magnitude * dx / dist;
					force.1 += magnitude * dy / dist;
				}
			}
		}
		force
	}
}
