//! Built-in GLSL sources and the include snippet table

pub const FLAT_VERTEX: &str = r#"#version 330 core
#pragma inject_attributes
#include "camera.glsl"

layout(location = 0) in vec3 a_Position;
layout(location = 2) in vec2 a_Uv;
#include "instancing_pars.glsl"

uniform mat4 u_Model;
#ifdef USE_TEXTURE_MAP
uniform mat3 u_TextureTransform;
out vec2 v_Uv;
#endif
out vec3 v_Color;
#include "fog_pars_vertex.glsl"

void main() {
    mat4 model = u_Model;
    v_Color = vec3(1.0);
#ifdef USE_INSTANCING
    model = model * a_InstanceTransform;
    v_Color = a_InstanceColor;
#endif
#ifdef USE_TEXTURE_MAP
    v_Uv = (u_TextureTransform * vec3(a_Uv, 1.0)).xy;
#endif
    vec4 viewPosition = u_View * model * vec4(a_Position, 1.0);
#include "fog_vertex.glsl"
    gl_Position = u_Projection * viewPosition;
}
"#;

pub const FLAT_FRAGMENT: &str = r#"#version 330 core
#pragma inject_attributes

uniform vec3 u_Color;
uniform float u_Opacity;
#ifdef USE_TEXTURE_MAP
uniform sampler2D u_TextureMap;
in vec2 v_Uv;
#endif
in vec3 v_Color;
#include "fog_pars_fragment.glsl"

out vec4 fragColor;

void main() {
    fragColor = vec4(u_Color * v_Color, u_Opacity);
#ifdef USE_TEXTURE_MAP
    fragColor *= texture(u_TextureMap, v_Uv);
#endif
#include "fog_fragment.glsl"
}
"#;

pub const PHONG_VERTEX: &str = r#"#version 330 core
#pragma inject_attributes
#include "camera.glsl"

layout(location = 0) in vec3 a_Position;
layout(location = 1) in vec3 a_Normal;
layout(location = 2) in vec2 a_Uv;
#include "instancing_pars.glsl"

uniform mat4 u_Model;
#ifdef USE_TEXTURE_MAP
uniform mat3 u_TextureTransform;
out vec2 v_Uv;
#endif
out vec3 v_Color;
out vec3 v_Normal;
out vec3 v_ViewPosition;
#include "fog_pars_vertex.glsl"

void main() {
    mat4 model = u_Model;
    v_Color = vec3(1.0);
#ifdef USE_INSTANCING
    model = model * a_InstanceTransform;
    v_Color = a_InstanceColor;
#endif
#ifdef USE_TEXTURE_MAP
    v_Uv = (u_TextureTransform * vec3(a_Uv, 1.0)).xy;
#endif
    mat4 modelView = u_View * model;
    v_Normal = mat3(transpose(inverse(modelView))) * a_Normal;
    vec4 viewPosition = modelView * vec4(a_Position, 1.0);
    v_ViewPosition = viewPosition.xyz;
#include "fog_vertex.glsl"
    gl_Position = u_Projection * viewPosition;
}
"#;

pub const PHONG_FRAGMENT: &str = r#"#version 330 core
#pragma inject_attributes

uniform vec3 u_AmbientLight;
uniform vec3 u_DiffuseColor;
uniform vec3 u_SpecularColor;
uniform float u_Shininess;
uniform float u_Opacity;
#ifdef USE_TEXTURE_MAP
uniform sampler2D u_TextureMap;
in vec2 v_Uv;
#endif
in vec3 v_Color;
in vec3 v_Normal;
in vec3 v_ViewPosition;
#include "lights_pars.glsl"
#include "fog_pars_fragment.glsl"

out vec4 fragColor;

void main() {
    vec4 diffuseColor = vec4(u_DiffuseColor * v_Color, u_Opacity);
#ifdef USE_TEXTURE_MAP
    diffuseColor *= texture(u_TextureMap, v_Uv);
#endif
#ifdef USE_FLAT_SHADED
    vec3 normal = normalize(cross(dFdx(v_ViewPosition), dFdy(v_ViewPosition)));
#else
    vec3 normal = normalize(v_Normal);
#endif
#ifdef USE_TWO_SIDED
    normal = gl_FrontFacing ? normal : -normal;
#endif
    vec3 viewDir = normalize(-v_ViewPosition);
    vec3 outgoing = u_AmbientLight * diffuseColor.rgb;
#if NUM_LIGHTS > 0
    for (int i = 0; i < NUM_LIGHTS; ++i) {
        outgoing += shade(u_Lights[i], normal, viewDir, diffuseColor.rgb);
    }
#endif
    fragColor = vec4(outgoing, diffuseColor.a);
#include "fog_fragment.glsl"
}
"#;

const CAMERA: &str = r"layout(std140) uniform ub_Camera {
    mat4 u_Projection;
    mat4 u_View;
};
";

const INSTANCING_PARS: &str = r"#ifdef USE_INSTANCING
layout(location = 4) in mat4 a_InstanceTransform;
layout(location = 8) in vec3 a_InstanceColor;
#endif
";

// Light slots are grouped directional, point, spot. `falloff` holds the
// penumbra cosine followed by the attenuation terms.
const LIGHTS_PARS: &str = r"#if NUM_LIGHTS > 0
struct Light {
    ivec4 kind;
    vec4 color;
    vec4 position;
    vec4 direction;
    vec4 falloff;
};

layout(std140) uniform ub_Lights {
    ivec4 u_LightCounts;
    Light u_Lights[NUM_LIGHTS];
};

vec3 shade(Light light, vec3 normal, vec3 viewDir, vec3 diffuse) {
    vec3 toLight = light.direction.xyz;
    float attenuation = 1.0;
    if (light.kind.x != 0) {
        vec3 offset = light.position.xyz - v_ViewPosition;
        float dist = length(offset);
        toLight = offset / max(dist, 1e-4);
        attenuation = 1.0 / (light.falloff.y + light.falloff.z * dist + light.falloff.w * dist * dist);
        if (light.kind.x == 2) {
            attenuation *= smoothstep(light.direction.w, light.falloff.x, dot(toLight, light.direction.xyz));
        }
    }
    float lambert = max(dot(normal, toLight), 0.0);
    float specular = pow(max(dot(normal, normalize(toLight + viewDir)), 0.0), u_Shininess);
    return light.color.rgb * attenuation * (diffuse * lambert + u_SpecularColor * specular);
}
#endif
";

const FOG_PARS_VERTEX: &str = r"#ifdef USE_FOG
out float v_FogDepth;
#endif
";

const FOG_VERTEX: &str = r"#ifdef USE_FOG
    v_FogDepth = -viewPosition.z;
#endif
";

const FOG_PARS_FRAGMENT: &str = r"#ifdef USE_FOG
uniform vec3 u_FogColor;
uniform int u_FogType;
uniform float u_FogNear;
uniform float u_FogFar;
uniform float u_FogDensity;
in float v_FogDepth;
#endif
";

const FOG_FRAGMENT: &str = r"#ifdef USE_FOG
    float fogFactor = u_FogType == 0
        ? smoothstep(u_FogNear, u_FogFar, v_FogDepth)
        : 1.0 - exp(-u_FogDensity * u_FogDensity * v_FogDepth * v_FogDepth);
    fragColor.rgb = mix(fragColor.rgb, u_FogColor, clamp(fogFactor, 0.0, 1.0));
#endif
";

/// Include name and body of every built-in snippet
pub const SNIPPETS: &[(&str, &str)] = &[
    ("camera.glsl", CAMERA),
    ("instancing_pars.glsl", INSTANCING_PARS),
    ("lights_pars.glsl", LIGHTS_PARS),
    ("fog_pars_vertex.glsl", FOG_PARS_VERTEX),
    ("fog_vertex.glsl", FOG_VERTEX),
    ("fog_pars_fragment.glsl", FOG_PARS_FRAGMENT),
    ("fog_fragment.glsl", FOG_FRAGMENT),
];
