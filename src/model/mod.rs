use serde::{Deserialize, Serialize};

/// `[longitude, latitude]`, exactly as the service sends it.
pub type Coordinates = [f64; 2];

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Place {
    #[serde(default)]
    pub place_id: Option<serde_json::Value>,
    #[serde(default)]
    pub place_name: Option<String>,
}

impl Place {
    pub fn name(&self) -> Option<&str> {
        self.place_name.as_deref().filter(|n| !n.is_empty())
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(Coordinates),
    MultiPoint(Vec<Coordinates>),
}

impl Geometry {
    pub fn coordinates(&self) -> Vec<Coordinates> {
        match self {
            Geometry::Point(c) => vec![*c],
            Geometry::MultiPoint(cs) => cs.clone(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct AlertProperties {
    pub id: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub disease: Option<String>,
    #[serde(default)]
    pub species: Option<String>,
    #[serde(default)]
    pub feed: Option<String>,
    #[serde(default)]
    pub rating: Option<serde_json::Value>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub places: Vec<Place>,
}

/// One GeoJSON feature as returned by the search endpoint.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Feature {
    pub geometry: Geometry,
    pub properties: AlertProperties,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct FeatureCollection {
    #[serde(default)]
    pub features: Vec<Feature>,
}

/// Stable handle of a map point: its insertion index in the aggregated list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PointId(pub usize);

#[derive(Clone, Debug, Serialize)]
pub struct AlertRecord {
    #[serde(flatten)]
    pub feature: Feature,
    pub points: Vec<PointId>,
    pub num_points: usize,
    pub link: String,
}

impl AlertRecord {
    pub fn from_feature(feature: Feature) -> Self {
        let link = derive_link(&feature.properties.id);
        Self {
            feature,
            points: Vec::new(),
            num_points: 0,
            link,
        }
    }

    pub fn id(&self) -> &str {
        &self.feature.properties.id
    }

    pub fn date(&self) -> &str {
        self.feature.properties.date.as_deref().unwrap_or_default()
    }

    pub fn summary(&self) -> &str {
        self.feature.properties.summary.as_deref().unwrap_or_default()
    }

    /// `"<date>: <summary>"`, the heading used when the alert is selected.
    pub fn headline(&self) -> String {
        format!("{}: {}", self.date(), self.summary())
    }
}

/// The alert id carries a 4 character suffix the public link does not use.
pub fn derive_link(id: &str) -> String {
    let keep = id.chars().count().saturating_sub(4);
    let base: String = id.chars().take(keep).collect();
    format!("http://www.healthmap.org/ln.php?{base}")
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MapPoint {
    pub id: PointId,
    pub ids: Vec<String>,
    pub coordinates: Coordinates,
    pub position: usize,
    pub picked: bool,
    pub highlighted: bool,
    pub place: Place,
}

impl MapPoint {
    /// Place name, or the raw coordinates when the place is unnamed.
    pub fn title(&self) -> String {
        match self.place.name() {
            Some(name) => name.to_string(),
            None => format_coordinates(self.coordinates),
        }
    }
}

pub fn format_coordinates(c: Coordinates) -> String {
    format!("{}, {}", c[0], c[1])
}
