use anyhow::Result;
use colloq_infrastructure::ConfigService;

pub fn show(service: &ConfigService) -> Result<()> {
    let config = service.get_config();
    print!("{}", config.to_toml_string()?);
    Ok(())
}

pub fn path(service: &ConfigService) -> Result<()> {
    println!("{}", service.config_path()?.display());
    Ok(())
}

pub fn init(service: &ConfigService) -> Result<()> {
    let path = service.config_path()?;
    if path.exists() {
        println!("Config already exists: {}", path.display());
        return Ok(());
    }

    let written = service.save(&service.get_config())?;
    println!("Wrote default config to {}", written.display());
    Ok(())
}
