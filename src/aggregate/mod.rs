use tracing::debug;

use crate::model::{AlertRecord, Coordinates, Feature, MapPoint, Place, PointId};

/// Adds `id` to the point at exactly `coordinates`, creating the point if no
/// existing one matches. Returns the id of the point that received it.
pub fn collect_point(
    points: &mut Vec<MapPoint>,
    id: &str,
    coordinates: Coordinates,
    place: &Place,
) -> PointId {
    if let Some(point) = points.iter_mut().find(|p| p.coordinates == coordinates) {
        point.ids.push(id.to_string());
        return point.id;
    }
    let point_id = PointId(points.len());
    points.push(MapPoint {
        id: point_id,
        ids: vec![id.to_string()],
        coordinates,
        position: points.len(),
        picked: false,
        highlighted: false,
        place: place.clone(),
    });
    point_id
}

/// Splits multi-location alerts into one point membership per coordinate and
/// merges memberships that share coordinates.
pub fn aggregate(features: Vec<Feature>) -> (Vec<AlertRecord>, Vec<MapPoint>) {
    let mut points: Vec<MapPoint> = Vec::new();
    let mut records: Vec<AlertRecord> = Vec::with_capacity(features.len());
    let empty = Place::default();

    for feature in features {
        let mut record = AlertRecord::from_feature(feature);
        let coordinates = record.feature.geometry.coordinates();
        record.num_points = coordinates.len();
        for (n, c) in coordinates.into_iter().enumerate() {
            let place = record.feature.properties.places.get(n).unwrap_or(&empty);
            let point = collect_point(&mut points, &record.feature.properties.id, c, place);
            record.points.push(point);
        }
        records.push(record);
    }

    debug!(
        records = records.len(),
        points = points.len(),
        "aggregated alerts into map points"
    );
    (records, points)
}
