//! Small helpers over lopdf objects.

use lopdf::{Dictionary, Document as LopdfDocument, Object, Stream};

use super::filters::{run_chain, Decoded, Filter, FilterStep, PredictorParams};

/// Indirection depth after which a reference chain is treated as broken.
const MAX_REFERENCE_DEPTH: usize = 32;

/// Follow references until a direct object is reached.
pub fn resolve<'a>(doc: &'a LopdfDocument, obj: &'a Object) -> Result<&'a Object, String> {
    let mut current = obj;
    for _ in 0..MAX_REFERENCE_DEPTH {
        match current {
            Object::Reference(id) => {
                current = doc
                    .get_object(*id)
                    .map_err(|e| format!("cannot resolve {} {} R: {}", id.0, id.1, e))?;
            }
            direct => return Ok(direct),
        }
    }
    Err("reference chain too deep".to_string())
}

/// Look up a key in a dictionary and resolve it.
pub fn get_resolved<'a>(
    doc: &'a LopdfDocument,
    dict: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Object> {
    dict.get(key).ok().and_then(|o| resolve(doc, o).ok())
}

/// Numeric value of an integer or real object.
pub fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Integer value of a dictionary entry, following references.
pub fn get_integer(doc: &LopdfDocument, dict: &Dictionary, key: &[u8]) -> Option<i64> {
    match get_resolved(doc, dict, key)? {
        Object::Integer(i) => Some(*i),
        Object::Real(r) => Some(*r as i64),
        _ => None,
    }
}

/// Numbers of an array entry, following references.
pub fn get_numbers(doc: &LopdfDocument, dict: &Dictionary, key: &[u8]) -> Option<Vec<f32>> {
    let items = get_resolved(doc, dict, key)?.as_array().ok()?;
    items
        .iter()
        .map(|o| resolve(doc, o).ok().and_then(number))
        .collect()
}

/// Build the filter chain declared by a stream dictionary.
pub fn filter_steps(doc: &LopdfDocument, dict: &Dictionary) -> Result<Vec<FilterStep>, String> {
    let filters: Vec<Filter> = match get_resolved(doc, dict, b"Filter") {
        None | Some(Object::Null) => return Ok(Vec::new()),
        Some(Object::Name(name)) => vec![Filter::from_name(name)],
        Some(Object::Array(items)) => items
            .iter()
            .map(|o| {
                resolve(doc, o)?
                    .as_name()
                    .map(Filter::from_name)
                    .map_err(|_| "filter array entry is not a name".to_string())
            })
            .collect::<Result<_, _>>()?,
        Some(other) => return Err(format!("invalid /Filter {:?}", other)),
    };

    let parms: Vec<Option<&Dictionary>> = match get_resolved(doc, dict, b"DecodeParms")
        .or_else(|| get_resolved(doc, dict, b"DP"))
    {
        Some(Object::Dictionary(d)) => vec![Some(d)],
        Some(Object::Array(items)) => items
            .iter()
            .map(|o| resolve(doc, o).ok().and_then(|o| o.as_dict().ok()))
            .collect(),
        _ => Vec::new(),
    };

    Ok(filters
        .into_iter()
        .enumerate()
        .map(|(i, filter)| FilterStep {
            filter,
            params: parms
                .get(i)
                .copied()
                .flatten()
                .map(|d| predictor_params(doc, d))
                .unwrap_or_default(),
        })
        .collect())
}

fn predictor_params(doc: &LopdfDocument, dict: &Dictionary) -> PredictorParams {
    let defaults = PredictorParams::default();
    let positive = |key: &[u8], fallback: usize| {
        get_integer(doc, dict, key)
            .filter(|v| *v > 0)
            .map(|v| v as usize)
            .unwrap_or(fallback)
    };

    PredictorParams {
        predictor: get_integer(doc, dict, b"Predictor").unwrap_or(defaults.predictor),
        colors: positive(b"Colors", defaults.colors),
        bits_per_component: positive(b"BitsPerComponent", defaults.bits_per_component),
        columns: positive(b"Columns", defaults.columns),
        early_change: get_integer(doc, dict, b"EarlyChange")
            .map_or(defaults.early_change, |v| v != 0),
    }
}

/// Fully decoded bytes of a non-image stream (lookup tables, profiles).
pub fn stream_bytes(doc: &LopdfDocument, stream: &Stream) -> Result<Vec<u8>, String> {
    let steps = filter_steps(doc, &stream.dict)?;
    match run_chain(&stream.content, &steps)? {
        Decoded::Samples(bytes) => Ok(bytes),
        Decoded::Jpeg(_) => Err("unexpected DCTDecode on a data stream".to_string()),
    }
}
