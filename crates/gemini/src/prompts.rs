//! Prompt text for the three generation operations.

/// Turn a snapshot into a studio model photo while preserving identity.
pub const MODEL_PROMPT: &str = "Take this person and create a professional full-body fashion \
photograph of them. Keep their exact face, hair, body type, skin tone, and all unique features \
completely unchanged. Position them in a natural standing model pose against a clean light gray \
studio background. The lighting should be soft and professional, like a high-end fashion \
photoshoot. Make it look like a real photograph taken in a professional studio.";

/// Dress the person of the first image in the garment of the second image.
pub const TRY_ON_PROMPT: &str = "Edit this person's photograph by replacing their current \
clothing with the garment shown in the second image. Keep the person's face, hair, pose, and \
background exactly as they are. Remove their current clothing completely and dress them in the \
new garment, matching its exact colors, patterns, and style. Make sure the garment fits naturally \
on their body with realistic fabric folds and shadows that match the original lighting. The \
result should look like they were originally photographed wearing this outfit.";

/// Re-render a photo from the viewpoint named by `pose_instruction`.
pub fn pose_prompt(pose_instruction: &str) -> String {
    format!(
        "Take this fashion photograph and recreate it from {}. Keep the person, their clothing, \
         and the background style exactly the same, just change the camera angle or perspective. \
         Make it look like a real photograph taken from this new viewpoint.",
        pose_instruction
    )
}
