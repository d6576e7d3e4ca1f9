use std::{
    fs,
    io::{self, Write},
    path::Path,
    process::Command,
};

const SHADER_OUT_DIR: &str = "res/shaders";

/// (source, output) pairs compiled by glslc
const SHADERS: &[(&str, &str)] = &[
    ("shaders/simple.vert", "simple_vert.spv"),
    ("shaders/simple.frag", "simple_frag.spv"),
];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=shaders/");

    fs::create_dir_all(SHADER_OUT_DIR)?;

    for (source, output) in SHADERS {
        let output = Path::new(SHADER_OUT_DIR).join(output);
        let result = match Command::new("glslc").arg(source).arg("-o").arg(&output).output() {
            Ok(result) => result,
            Err(err) if output.is_file() => {
                // falls back to the checked-in binary under res/shaders
                println!("cargo:warning=glslc unavailable ({err}), keeping {}", output.display());
                continue;
            }
            Err(err) => {
                let missing = output.display();
                return Err(format!("glslc unavailable ({err}) and {missing} is missing").into());
            }
        };
        io::stdout().write_all(&result.stdout)?;
        io::stderr().write_all(&result.stderr)?;
        if !result.status.success() {
            return Err(format!("glslc failed to compile {source}").into());
        }
    }

    Ok(())
}
