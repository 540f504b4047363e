use crate::boundary::Boundary;
use crate::error::Error;
use crate::heightmap::Coordinate;
use crate::path::GridPath;

/// Reads a boundary description: four positive integers giving the lengths
/// of the source, top, sink and bottom paths, followed by that many `x y`
/// coordinate pairs. Consecutive paths must share their join vertex, and all
/// coordinates must lie inside a `width` by `height` grid.
pub fn read_boundary(content: &str, width: usize, height: usize) -> Result<Boundary, Error> {
    let numbers: Vec<&str> = content.split_whitespace().collect();

    if numbers.len() < 4 {
        return Err(Error::InvalidInput(
            "Premature end of file (should contain at least four numbers)".into(),
        ));
    }

    let source_length = parse_length(numbers[0], "Source")?;
    let top_length = parse_length(numbers[1], "Top")?;
    let sink_length = parse_length(numbers[2], "Sink")?;
    let bottom_length = parse_length(numbers[3], "Bottom")?;

    let expected = source_length + top_length + sink_length + bottom_length;
    if numbers.len() != 4 + 2 * expected {
        return Err(Error::InvalidInput(format!(
            "File should contain {} x- and y-coordinates (encountered {})",
            2 * expected,
            numbers.len() - 4
        )));
    }

    let mut index = 4;
    let source = read_path(&numbers, source_length, width, height, &mut index)?;
    let top = read_path(&numbers, top_length, width, height, &mut index)?;
    let sink = read_path(&numbers, sink_length, width, height, &mut index)?;
    let bottom = read_path(&numbers, bottom_length, width, height, &mut index)?;

    if source.end() != top.start() {
        return Err(Error::InvalidBoundary("The source does not connect to the top".into()));
    }
    if top.end() != sink.start() {
        return Err(Error::InvalidBoundary("The top does not connect to the sink".into()));
    }
    if sink.end() != bottom.start() {
        return Err(Error::InvalidBoundary("The sink does not connect to the bottom".into()));
    }
    if bottom.end() != source.start() {
        return Err(Error::InvalidBoundary("The bottom does not connect to the source".into()));
    }

    Ok(Boundary::new(source, top, sink, bottom))
}

pub fn read_boundary_from_path(
    path: &std::path::Path,
    width: usize,
    height: usize,
) -> Result<Boundary, Error> {
    read_boundary(&std::fs::read_to_string(path)?, width, height)
}

fn parse_length(token: &str, what: &str) -> Result<usize, Error> {
    let value: i64 = token.parse().map_err(|_| {
        Error::InvalidInput(format!("{what} length should be an integer (was [{token}])"))
    })?;
    if value <= 0 {
        return Err(Error::InvalidInput(format!(
            "{what} length should be positive (was [{value}])"
        )));
    }
    Ok(value as usize)
}

fn read_path(
    numbers: &[&str],
    length: usize,
    width: usize,
    height: usize,
    index: &mut usize,
) -> Result<GridPath, Error> {
    let mut path = GridPath::new();
    for _ in 0..length {
        let x = parse_coordinate(numbers[*index])?;
        *index += 1;
        let y = parse_coordinate(numbers[*index])?;
        *index += 1;
        if x < 0 || x >= width as i32 || y < 0 || y >= height as i32 {
            return Err(Error::InvalidInput(format!("Coordinate [{x}, {y}] is out of bounds")));
        }
        path.add_point(Coordinate::new(x, y));
    }
    Ok(path)
}

fn parse_coordinate(token: &str) -> Result<i32, Error> {
    token.parse().map_err(|_| {
        Error::InvalidInput(format!("Coordinate [{token}] should be an integer"))
    })
}
