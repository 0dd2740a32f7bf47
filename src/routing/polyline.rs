//! Google encoded polyline codec.
//!
//! Routes arrive from upstream directions APIs as compact delta/zig-zag
//! encoded strings at 1e-5 precision. Decoding happens once at the provider
//! boundary; the rest of the service works with plain coordinate sequences.

const PRECISION: f64 = 1e5;

/// Decodes an encoded polyline into `(lat, lng)` pairs.
///
/// Malformed or truncated input is not an error: decoding stops at the first
/// group that cannot be completed, and an incomplete trailing latitude group
/// is dropped rather than emitting a half-formed pair. This mirrors the
/// behaviour of the upstream encoders this service consumes.
pub fn decode(encoded: &str) -> Vec<(f64, f64)> {
    let bytes = encoded.as_bytes();
    let mut points = Vec::new();
    let mut idx = 0;
    let mut lat: i64 = 0;
    let mut lng: i64 = 0;

    while idx < bytes.len() {
        let Some((dlat, next)) = decode_group(bytes, idx) else {
            break;
        };
        let Some((dlng, after)) = decode_group(bytes, next) else {
            break;
        };

        lat += dlat;
        lng += dlng;
        points.push((lat as f64 / PRECISION, lng as f64 / PRECISION));
        idx = after;
    }

    points
}

/// Encodes `(lat, lng)` pairs into the compact polyline format.
pub fn encode(points: &[(f64, f64)]) -> String {
    let mut out = String::new();
    let mut prev_lat: i64 = 0;
    let mut prev_lng: i64 = 0;

    for &(lat, lng) in points {
        let lat = (lat * PRECISION).round() as i64;
        let lng = (lng * PRECISION).round() as i64;
        encode_group(lat - prev_lat, &mut out);
        encode_group(lng - prev_lng, &mut out);
        prev_lat = lat;
        prev_lng = lng;
    }

    out
}

/// Accumulates one signed delta from 5-bit groups starting at `idx`.
///
/// Returns `None` when the input ends before a terminating group (a byte
/// without the continuation bit) or a byte falls below the printable range.
fn decode_group(bytes: &[u8], mut idx: usize) -> Option<(i64, usize)> {
    let mut result: i64 = 0;
    let mut shift = 0u32;

    loop {
        let byte = i64::from(*bytes.get(idx)?) - 63;
        if byte < 0 {
            return None;
        }
        // A valid delta terminates well before the shift exhausts i64; a
        // longer continuation run is garbage input, not a bigger number.
        if shift > 63 {
            return None;
        }
        result |= (byte & 0x1f) << shift;
        shift += 5;
        idx += 1;
        if byte < 0x20 {
            break;
        }
    }

    // zig-zag: odd accumulations are negated
    let value = if result & 1 == 1 {
        !(result >> 1)
    } else {
        result >> 1
    };

    Some((value, idx))
}

fn encode_group(delta: i64, out: &mut String) {
    let mut value = if delta < 0 { !(delta << 1) } else { delta << 1 };

    while value >= 0x20 {
        out.push((((value & 0x1f) | 0x20) as u8 + 63) as char);
        value >>= 5;
    }
    out.push((value as u8 + 63) as char);
}

#[cfg(test)]
mod tests {
    use super::*;

    // Reference example from the polyline format documentation.
    const REFERENCE: &str = "_p~iF~ps|U_ulLnnqC_mqNvxq`@";
    const REFERENCE_POINTS: [(f64, f64); 3] =
        [(38.5, -120.2), (40.7, -120.95), (43.252, -126.453)];

    #[test]
    fn decodes_reference_polyline() {
        let points = decode(REFERENCE);
        assert_eq!(points.len(), 3);
        for (decoded, expected) in points.iter().zip(REFERENCE_POINTS) {
            assert!((decoded.0 - expected.0).abs() < 1e-5);
            assert!((decoded.1 - expected.1).abs() < 1e-5);
        }
    }

    #[test]
    fn encodes_reference_points() {
        assert_eq!(encode(&REFERENCE_POINTS), REFERENCE);
    }

    #[test]
    fn round_trip_preserves_coordinates_within_precision() {
        let points = vec![
            (41.0082, 28.9784),
            (41.0351, 28.9850),
            (40.9923, 29.0275),
            (-33.8688, 151.2093),
        ];
        let decoded = decode(&encode(&points));
        assert_eq!(decoded.len(), points.len());
        for (a, b) in decoded.iter().zip(&points) {
            assert!((a.0 - b.0).abs() < 1e-5, "lat drift: {} vs {}", a.0, b.0);
            assert!((a.1 - b.1).abs() < 1e-5, "lng drift: {} vs {}", a.1, b.1);
        }
    }

    #[test]
    fn empty_input_decodes_to_nothing() {
        assert!(decode("").is_empty());
    }

    #[test]
    fn unterminated_continuation_run_decodes_to_nothing() {
        // Every byte carries the continuation bit, so no group ever
        // terminates; the run must be discarded, not accumulated forever.
        assert!(decode(&"~".repeat(14)).is_empty());
        assert!(decode(&"~".repeat(100)).is_empty());
    }

    #[test]
    fn truncated_input_drops_incomplete_pair() {
        let full = encode(&[(38.5, -120.2), (40.7, -120.95)]);
        // Cut inside the second pair's longitude group: only the first
        // complete pair survives.
        let truncated = &full[..full.len() - 1];
        let points = decode(truncated);
        assert_eq!(points.len(), 1);
        assert!((points[0].0 - 38.5).abs() < 1e-5);
        assert!((points[0].1 - -120.2).abs() < 1e-5);
    }
}
