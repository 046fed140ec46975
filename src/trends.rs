use std::fmt;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

/// Category tag a trend is filed under. The set is fixed at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendCategory {
    Art,
    Characters,
    Poster,
    Backgrounds,
    Fashion,
}

impl fmt::Display for TrendCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TrendCategory::Art => "Art",
            TrendCategory::Characters => "Characters",
            TrendCategory::Poster => "Poster",
            TrendCategory::Backgrounds => "Backgrounds",
            TrendCategory::Fashion => "Fashion",
        };
        f.write_str(label)
    }
}

/// A stylistic template pairing a generation prompt with a preview image.
/// Defined at build time and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trend {
    pub id: String,
    pub name: String,
    pub description: String,
    pub prompt: String,
    pub example_image: String,
    pub category: TrendCategory,
}

static CATALOG: LazyLock<Vec<Trend>> = LazyLock::new(|| {
    vec![
        Trend {
            id: "90s-film-aesthetic".to_string(),
            name: "90s Film Aesthetic".to_string(),
            description: "Capture the essence of a 90s film with a retro, grainy look, romantic atmosphere, and vintage fashion.".to_string(),
            prompt: "Create a retro, vintage-inspired, grainy yet bright image with small sunbeams based on the reference image. Keep the exact same face and hairstyle of the reference person. The man should wear a lightweight garnet shirt, combined with white pants plated in a Pinterest-inspired aesthetic. The atmosphere must capture the essence of a 90s film, in a windy and romantic atmosphere. Standing in the aesthetic street light and reading books while a few leaves blow into the air with dramatic contrasts.".to_string(),
            example_image: "https://picsum.photos/seed/90sfilm/500/500".to_string(),
            category: TrendCategory::Art,
        },
        Trend {
            id: "lemon-green-fashion".to_string(),
            name: "Futuristic Green Outfit".to_string(),
            description: "Style yourself in a futuristic fashion editorial with a lemon-green combat jean and oversized sweatshirt.".to_string(),
            prompt: "A male model, with the exact same face & hairstyle as the uploaded photo, not changing the facial expression. The model is wearing an oversized white sweatshirt, lemon green oversized combat jeans, styled with lemon green neutral or nike sneakers and white ribbed socks. Environment: muted lemon green-toned studio background. Lighting: soft cinematic glow highlighting skin and fabric textures. Style: fashion editorial and futuristic. Composition: model seated elegantly with relaxed posture.".to_string(),
            example_image: "https://picsum.photos/seed/lemongreen/500/500".to_string(),
            category: TrendCategory::Fashion,
        },
        Trend {
            id: "cinematic-shadow-portrait".to_string(),
            name: "Cinematic Shadow Portrait".to_string(),
            description: "Create a dramatic, high-resolution cinematic portrait with strong shadows from Venetian blinds.".to_string(),
            prompt: "A high-resolution 8K cinematic image of the man in the uploaded image, sitting on a wooden chair with his arms crossed on the chair's back. He is wearing an oversized white T-shirt, black pants, an Apple Watch, and stylish sunglasses. A strong spotlight filters through the Venetian blinds, casting dramatic shadows on his face, body, and the background wall. The composition is simple, with a dark, neutral background and geometric lighting patterns. His expression is both confident and calm, giving the image an elegant cinematic feel. Important: The face and hairstyle must match exactly the reference image provided. Maintain the same texture and length of the hairstyle, and the same facial proportions. The lighting should mimic the effect of the striped shadow cast by the blinds on his face and body. The person must remain seated on the wooden chair with their arms crossed, not standing.".to_string(),
            example_image: "https://picsum.photos/seed/cinematicshadow/500/500".to_string(),
            category: TrendCategory::Characters,
        },
        Trend {
            id: "polaroid-flash-photo".to_string(),
            name: "Polaroid Flash Photo".to_string(),
            description: "A candid, slightly blurry Polaroid-style photo with a flash effect and a simple white curtain background.".to_string(),
            prompt: "Recreate the uploaded image as if it were a photo taken with a Polaroid camera. The final image should have a slight blur and a harsh, direct flash effect as if taken in a dark room. Do not change the faces or poses of the people in the image. Replace the original background with simple white curtains. The subjects should be looking towards the camera.".to_string(),
            example_image: "https://picsum.photos/seed/polaroidhug/500/500".to_string(),
            category: TrendCategory::Art,
        },
    ]
});

pub fn catalog() -> &'static [Trend] {
    &CATALOG
}

pub fn find(id: &str) -> Option<&'static Trend> {
    CATALOG.iter().find(|trend| trend.id == id)
}

/// Display label for a trend reference. A gallery record may point at a
/// trend that has since left the catalog; such references resolve to a
/// placeholder label instead of failing.
pub fn display_name(id: &str) -> &'static str {
    find(id).map(|trend| trend.name.as_str()).unwrap_or("Unknown trend")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_ids_are_unique() {
        let mut ids: Vec<_> = catalog().iter().map(|trend| trend.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), catalog().len());
    }

    #[test]
    fn dangling_trend_reference_resolves_to_placeholder() {
        assert_eq!(display_name("90s-film-aesthetic"), "90s Film Aesthetic");
        assert_eq!(display_name("no-such-trend"), "Unknown trend");
    }

    #[test]
    fn categories_serialize_as_display_labels() {
        let json = serde_json::to_string(&TrendCategory::Backgrounds).unwrap();
        assert_eq!(json, "\"Backgrounds\"");
    }
}
