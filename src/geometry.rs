//! Vector tile geometry command streams.
//!
//! Geometry is a sequence of command integers, each followed by `count`
//! pairs of zigzag encoded deltas relative to a cursor that starts at the
//! tile origin for every feature.

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GeoCommand {
    MoveTo,
    LineTo,
    ClosePath,
    Unknown,
}

impl GeoCommand {
    pub fn id(&self) -> u32 {
        match self {
            GeoCommand::MoveTo => 1,
            GeoCommand::LineTo => 2,
            GeoCommand::ClosePath => 7,
            GeoCommand::Unknown => 0,
        }
    }
}

impl From<u32> for GeoCommand {
    fn from(n: u32) -> GeoCommand {
        match n & 7 {
            1 => GeoCommand::MoveTo,
            2 => GeoCommand::LineTo,
            7 => GeoCommand::ClosePath,
            _ => GeoCommand::Unknown,
        }
    }
}

/// A position in tile pixel space. Also used as the encoding cursor.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Pixel {
    pub x: i32,
    pub y: i32,
}

impl Pixel {
    pub const fn new(x: i32, y: i32) -> Self {
        Pixel { x, y }
    }

    fn delta_from(&self, cursor: Pixel) -> Pixel {
        Pixel {
            x: self.x.wrapping_sub(cursor.x),
            y: self.y.wrapping_sub(cursor.y),
        }
    }
}

impl From<(i32, i32)> for Pixel {
    fn from((x, y): (i32, i32)) -> Self {
        Pixel { x, y }
    }
}

pub fn command_integer(id: u32, count: u32) -> u32 {
    (id & 0x7) | (count << 3)
}

/// Splits a command integer back into its `(id, count)`.
pub fn split_command(n: u32) -> (u32, u32) {
    (n & 0x7, n >> 3)
}

pub fn zigzag(v: i32) -> u32 {
    ((v << 1) ^ (v >> 31)) as u32
}

pub fn unzigzag(n: u32) -> i32 {
    ((n >> 1) as i32) ^ -((n & 1) as i32)
}

fn push_delta(geometry: &mut Vec<u32>, delta: Pixel) {
    geometry.push(zigzag(delta.x));
    geometry.push(zigzag(delta.y));
}

/// Appends a single `MoveTo` carrying every point, returning the new cursor.
pub fn encode_points(geometry: &mut Vec<u32>, mut cursor: Pixel, points: &[Pixel]) -> Pixel {
    geometry.push(command_integer(GeoCommand::MoveTo.id(), points.len() as u32));
    for point in points {
        push_delta(geometry, point.delta_from(cursor));
        cursor = *point;
    }

    cursor
}

/// Appends one closed ring. The ring must not repeat its first vertex at the end.
pub fn encode_ring(geometry: &mut Vec<u32>, cursor: Pixel, ring: &[Pixel]) -> Pixel {
    let Some((first, rest)) = ring.split_first() else {
        return cursor;
    };

    let delta = first.delta_from(cursor);
    geometry.push(command_integer(GeoCommand::MoveTo.id(), 1));
    push_delta(geometry, delta);
    // The cursor takes the delta, not the vertex. Both agree only while
    // each feature holds a single ring starting from the origin.
    let mut cursor = delta;

    geometry.push(command_integer(GeoCommand::LineTo.id(), rest.len() as u32));
    for vertex in rest {
        push_delta(geometry, vertex.delta_from(cursor));
        cursor = *vertex;
    }
    geometry.push(command_integer(GeoCommand::ClosePath.id(), 1));

    cursor
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PathEvent {
    MoveTo(Pixel),
    LineTo(Pixel),
    ClosePath,
}

/// Walks a geometry stream yielding absolute positions.
///
/// Stops at the first truncated parameter pair or unknown command.
pub struct PathIter<I: Iterator<Item = u32>> {
    inner: std::iter::Fuse<I>,
    cursor: Pixel,
    command: GeoCommand,
    count: u32,
}

impl<I: Iterator<Item = u32>> PathIter<I> {
    pub fn new(inner: I) -> Self {
        PathIter {
            inner: inner.fuse(),
            cursor: Pixel::default(),
            command: GeoCommand::Unknown,
            count: 0,
        }
    }
}

impl<I: Iterator<Item = u32>> Iterator for PathIter<I> {
    type Item = PathEvent;

    fn next(&mut self) -> Option<Self::Item> {
        while self.count == 0 {
            let next = self.inner.next()?;
            self.command = next.into();
            self.count = next >> 3;
        }

        self.count -= 1;

        match self.command {
            GeoCommand::MoveTo | GeoCommand::LineTo => {
                let dx = self.inner.next();
                let dy = self.inner.next();
                let (dx, dy) = dx.zip(dy)?;

                self.cursor.x = self.cursor.x.wrapping_add(unzigzag(dx));
                self.cursor.y = self.cursor.y.wrapping_add(unzigzag(dy));

                if self.command == GeoCommand::MoveTo {
                    Some(PathEvent::MoveTo(self.cursor))
                } else {
                    Some(PathEvent::LineTo(self.cursor))
                }
            }
            GeoCommand::ClosePath => Some(PathEvent::ClosePath),
            GeoCommand::Unknown => {
                self.count = 0;
                None
            }
        }
    }
}
