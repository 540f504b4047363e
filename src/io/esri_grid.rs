use crate::error::Error;
use crate::heightmap::Coordinate;
use crate::heightmap::Heightmap;
use crate::units::Units;
use std::collections::HashMap;

/// Reads a heightmap in the ESRI/ASCII grid format: a header of
/// case-insensitive `key value` lines (`ncols`, `nrows`, `cellsize` and
/// `nodata_value` are required; `xllcorner` and `yllcorner` are accepted and
/// ignored), followed by `nrows * ncols` elevations in row-major order.
/// Cells equal to the nodata value become nodata.
///
/// Some grid files in the wild use a decimal comma; if the strict parse
/// fails, a second attempt replaces commas by decimal points. If both fail,
/// the error of the strict attempt is reported.
pub fn read_esri_grid(content: &str) -> Result<(Heightmap, Units), Error> {
    match parse(content, false) {
        Ok(result) => Ok(result),
        Err(first) => parse(content, true).map_err(|_| first),
    }
}

pub fn read_esri_grid_from_path(path: &std::path::Path) -> Result<(Heightmap, Units), Error> {
    read_esri_grid(&std::fs::read_to_string(path)?)
}

fn parse(content: &str, decimal_comma: bool) -> Result<(Heightmap, Units), Error> {
    let tokens: Vec<&str> = content.split_whitespace().collect();

    // header: key-value pairs as long as the token starts with a letter
    let mut header: HashMap<String, f64> = HashMap::new();
    let mut i = 0;
    while i < tokens.len() && tokens[i].chars().next().is_some_and(char::is_alphabetic) {
        let key = tokens[i].to_lowercase();
        let Some(&value) = tokens.get(i + 1) else {
            return Err(Error::InvalidInput(format!("Missing value for {key}")));
        };
        let value = parse_number(value, &key, decimal_comma)?;
        header.insert(key, value);
        i += 2;
    }

    let width = positive_int_from_header(&header, "ncols")?;
    let height = positive_int_from_header(&header, "nrows")?;
    let nodata = number_from_header(&header, "nodata_value")?;
    let resolution = number_from_header(&header, "cellsize")?;

    if tokens.len() - i != width * height {
        return Err(Error::InvalidInput(format!(
            "File should contain {width} x {height} = {} elevation measures (encountered {})",
            width * height,
            tokens.len() - i
        )));
    }

    let mut heightmap = Heightmap::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let elevation = parse_number(tokens[i], "Elevation data", decimal_comma)?;
            if elevation != nodata {
                heightmap.set_elevation_at(Coordinate::new(x as i32, y as i32), elevation);
            }
            i += 1;
        }
    }

    Ok((heightmap, Units::new(resolution, resolution)))
}

fn parse_number(token: &str, what: &str, decimal_comma: bool) -> Result<f64, Error> {
    let normalized = if decimal_comma { token.replace(',', ".") } else { token.to_string() };
    normalized
        .parse()
        .map_err(|_| Error::InvalidInput(format!("{what} should be numeric (was [{token}])")))
}

fn number_from_header(header: &HashMap<String, f64>, key: &str) -> Result<f64, Error> {
    header
        .get(key)
        .copied()
        .ok_or_else(|| Error::InvalidInput(format!("Missing value for {key}")))
}

fn positive_int_from_header(header: &HashMap<String, f64>, key: &str) -> Result<usize, Error> {
    let value = number_from_header(header, key)?;
    if value.fract() != 0. {
        return Err(Error::InvalidInput(format!("{key} should be an integer (was [{value}])")));
    }
    if value <= 0. {
        return Err(Error::InvalidInput(format!("{key} should be positive (was [{value}])")));
    }
    Ok(value as usize)
}
