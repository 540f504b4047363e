use crate::error::Error;
use crate::heightmap::Coordinate;
use crate::heightmap::Heightmap;
use crate::units::Units;

/// Reads a heightmap in the legacy text format: six numbers `width height
/// x-resolution y-resolution minimum maximum` followed by `width * height`
/// elevation values with `e(x, y)` at token `6 + width * y + x`. The minimum
/// and maximum are parsed for compatibility with old files but ignored.
pub fn read_text_heightmap(content: &str) -> Result<(Heightmap, Units), Error> {
    let numbers: Vec<&str> = content.split_whitespace().collect();

    if numbers.len() < 6 {
        return Err(Error::InvalidInput(
            "Premature end of file (should contain at least six numbers indicating the width, \
             height, x-resolution, y-resolution, minimum height, maximum height)"
                .into(),
        ));
    }

    let width = parse_positive_int(numbers[0], "Width")?;
    let height = parse_positive_int(numbers[1], "Height")?;
    let x_res = parse_positive_number(numbers[2], "x-resolution")?;
    let y_res = parse_positive_number(numbers[3], "y-resolution")?;
    // minimum and maximum height are unused
    parse_number(numbers[4], "Minimum height")?;
    parse_number(numbers[5], "Maximum height")?;

    if numbers.len() != 6 + width * height {
        return Err(Error::InvalidInput(format!(
            "File should contain {width} x {height} = {} elevation measures (encountered {})",
            width * height,
            numbers.len() - 6
        )));
    }

    let mut heightmap = Heightmap::new(width, height);
    for x in 0..width {
        for y in 0..height {
            let elevation = parse_number(numbers[6 + width * y + x], "Elevation data")?;
            heightmap.set_elevation_at(Coordinate::new(x as i32, y as i32), elevation);
        }
    }

    Ok((heightmap, Units::new(x_res, y_res)))
}

pub fn read_text_heightmap_from_path(
    path: &std::path::Path,
) -> Result<(Heightmap, Units), Error> {
    read_text_heightmap(&std::fs::read_to_string(path)?)
}

fn parse_number(token: &str, what: &str) -> Result<f64, Error> {
    token
        .parse()
        .map_err(|_| Error::InvalidInput(format!("{what} should be a number (was [{token}])")))
}

fn parse_positive_number(token: &str, what: &str) -> Result<f64, Error> {
    let value = parse_number(token, what)?;
    if value <= 0. {
        return Err(Error::InvalidInput(format!("{what} should be positive (was [{value}])")));
    }
    Ok(value)
}

fn parse_positive_int(token: &str, what: &str) -> Result<usize, Error> {
    let value: i64 = token
        .parse()
        .map_err(|_| Error::InvalidInput(format!("{what} should be an integer (was [{token}])")))?;
    if value <= 0 {
        return Err(Error::InvalidInput(format!("{what} should be positive (was [{value}])")));
    }
    Ok(value as usize)
}
