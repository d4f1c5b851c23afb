//! Names shared with the shader function libraries, plus execution and
//! group orders.
//!
//! The libraries themselves ship with the renderer; only their names and
//! subroutine signatures are relied on here.

/// Execution order of the built-in stages. Custom SRSs slot in between.
pub mod order {
    pub const FFP_TRANSFORM: i32 = 100;
    pub const FFP_COLOUR: i32 = 200;
    pub const FFP_LIGHTING: i32 = 300;
    pub const INTEGRATED_SHADOW: i32 = 350;
    pub const FFP_TEXTURING: i32 = 400;
    pub const FFP_FOG: i32 = 500;
}

/// Group orders of emitted invocations inside each entry function.
pub mod group {
    pub const VS_TRANSFORM: i32 = 100;
    pub const VS_COLOUR: i32 = 200;
    pub const VS_LIGHTING_SETUP: i32 = 250;
    pub const VS_LIGHTING: i32 = 300;
    pub const VS_SHADOW: i32 = 350;
    pub const VS_TEXTURING: i32 = 400;
    pub const VS_FOG: i32 = 500;

    pub const PS_COLOUR_BEGIN: i32 = 100;
    pub const PS_LIGHTING: i32 = PS_COLOUR_BEGIN + 1;
    pub const PS_SHADOW: i32 = PS_COLOUR_BEGIN + 2;
    pub const PS_SAMPLING: i32 = 150;
    pub const PS_TEXTURING: i32 = 200;
    pub const PS_COLOUR_END: i32 = 300;
    pub const PS_FOG: i32 = 400;
}

pub mod lib {
    pub const COMMON: &str = "FFPLib_Common";
    pub const TRANSFORM: &str = "FFPLib_Transform";
    pub const LIGHTING: &str = "FFPLib_Lighting";
    pub const TEXTURING: &str = "FFPLib_Texturing";
    pub const FOG: &str = "FFPLib_Fog";
    pub const PER_PIXEL_LIGHTING: &str = "SGXLib_PerPixelLighting";
    pub const NORMAL_MAP_LIGHTING: &str = "SGXLib_NormalMapLighting";
    pub const COOK_TORRANCE: &str = "SGXLib_CookTorrance";
    pub const INTEGRATED_PSSM: &str = "SGXLib_IntegratedPSSM";
}

pub mod func {
    pub const TRANSFORM: &str = "FFP_Transform";
    pub const ASSIGN: &str = "FFP_Assign";
    pub const MODULATE: &str = "FFP_Modulate";
    pub const MODULATE_X2: &str = "FFP_ModulateX2";
    pub const ADD: &str = "FFP_Add";
    pub const SUBTRACT: &str = "FFP_Subtract";
    pub const NORMALIZE: &str = "FFP_Normalize";
    pub const SAMPLE_TEXTURE: &str = "FFP_SampleTexture";

    pub const FOG_LINEAR: &str = "FFP_VertexFog_Linear";
    pub const FOG_EXP: &str = "FFP_VertexFog_Exp";
    pub const FOG_EXP2: &str = "FFP_VertexFog_Exp2";
    pub const LERP_FOG: &str = "FFP_LerpFog";
    pub const PIXEL_FOG_DEPTH: &str = "FFP_PixelFog_Depth";
    pub const PIXEL_FOG_LINEAR: &str = "FFP_PixelFog_Linear";
    pub const PIXEL_FOG_EXP: &str = "FFP_PixelFog_Exp";
    pub const PIXEL_FOG_EXP2: &str = "FFP_PixelFog_Exp2";

    pub const TRANSFORM_NORMAL: &str = "SGX_TransformNormal";
    pub const TRANSFORM_POSITION: &str = "SGX_TransformPosition";
    pub const CONSTRUCT_TBN: &str = "SGX_ConstructTBNMatrix";
    pub const FETCH_NORMAL: &str = "SGX_FetchNormal";

    pub const PSSM_SHADOW_FACTOR: &str = "SGX_ComputeShadowFactor_PSSM3";
    pub const PSSM_SPLIT_DEBUG: &str = "SGX_ShowSplits_PSSM3";
    pub const APPLY_SHADOW_FACTOR: &str = "SGX_ApplyShadowFactor_Diffuse";
    pub const MODULATE_SCALAR: &str = "SGX_ModulateScalar";

    pub const PBR_FETCH_METAL_ROUGHNESS: &str = "PBR_FetchMetalRoughness";
}
