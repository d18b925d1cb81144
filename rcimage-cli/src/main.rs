use argh::FromArgs;
use log::{error, info, warn};
use rcimage::Cipher;
use std::path::PathBuf;

mod convert;

/// RC image converter. Extracts RCT/RC8 containers to PNG and packs PNGs back into containers.
#[derive(FromArgs)]
struct Cli {
    /// password for encrypted RCT images
    #[argh(option, short = 'k')]
    password: Option<String>,

    /// encrypt packed RCT images, needs --password
    #[argh(switch, short = 'c')]
    encrypt: bool,

    /// container to extract to PNG, may be repeated. `name.rct` is merged with `name_.rc8` if
    /// that exists.
    #[argh(option, short = 'e')]
    extract: Vec<PathBuf>,

    /// PNG to pack, may be repeated. RGBA images produce a `name_.rc8` alpha mask as well.
    #[argh(option, short = 'p')]
    pack: Vec<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let Cli {
        password,
        encrypt,
        extract,
        pack,
    } = argh::from_env();

    if extract.is_empty() && pack.is_empty() {
        return Err("nothing to do, pass files with --extract or --pack".into());
    }

    let cipher = password.as_deref().map(Cipher::from_password);
    if encrypt && cipher.is_none() {
        warn!("--encrypt given without --password, packed images will not be encrypted");
    }
    let pack_cipher = cipher.as_ref().filter(|_| encrypt);

    let mut failed = 0;

    for input in &extract {
        info!("Converting `{}` to PNG", input.display());
        match convert::extract(input, cipher.as_ref()) {
            Ok(output) => info!("Written `{}`", output.display()),
            Err(e) => {
                error!("{e}");
                failed += 1;
            }
        }
    }

    for input in &pack {
        info!("Converting `{}` to RC", input.display());
        match convert::pack(input, pack_cipher) {
            Ok(outputs) => {
                for output in outputs {
                    info!("Written `{}`", output.display());
                }
            }
            Err(e) => {
                error!("{e}");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(format!(
            "{failed} of {} conversions failed",
            extract.len() + pack.len()
        )
        .into());
    }

    Ok(())
}
