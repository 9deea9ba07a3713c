use compound_domain::{convert, Compound, CompoundRepository, CompoundTag, Solution, SolutionIngredient, Unit};
use compound_migration::MigrationState;
use compound_persistence::DieselCompoundStore;
use pubchem_client::{IdentifierKind, PubChemClient};
use std::error::Error;
use std::io::{self, Write};
use uuid::Uuid;

/// Pequeño menú interactivo para buscar compuestos en la base remota y
/// administrar la colección local (compuestos, soluciones y etiquetas)
/// usando el almacén provisto por `compound-persistence`.
///
/// El arranque chequea la versión de esquema del almacén activo y corre
/// la migración si hace falta. El estado resultante se pasa explícito:
/// con un fallo de migración la aplicación no abre el almacén ni muestra
/// datos parciales; relanzar reintenta.
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let store_dir = compound_persistence::store_dir_from_env();
    let migration_state = compound_persistence::bootstrap(&store_dir);
    match &migration_state {
        MigrationState::NotNeeded => {}
        MigrationState::Completed(report) => {
            println!("Almacén migrado al esquema vigente: {} compuestos, {} soluciones, {} ingredientes",
                     report.compounds, report.solutions, report.ingredients);
        }
        MigrationState::Failed(reason) => {
            eprintln!("La migración del almacén falló: {}", reason);
            eprintln!("No se abre el almacén para no mostrar datos parciales; relanzar reintenta.");
            std::process::exit(1);
        }
    }

    let store = compound_persistence::open_active(&store_dir).map_err(|e| Box::new(e) as Box<dyn Error>)?;
    let client = PubChemClient::new();

    loop {
        println!("\n== Compound CLI menu ==");
        println!("1) Buscar compuesto en PubChem y guardarlo");
        println!("2) Ver compuestos");
        println!("3) Crear solución");
        println!("4) Ver soluciones");
        println!("5) Convertir una cantidad");
        println!("6) Etiquetar compuesto");
        println!("7) Eliminar solución");
        println!("8) Salir");
        print!("Elige una opción: ");
        io::stdout().flush().ok();

        let mut choice = String::new();
        io::stdin().read_line(&mut choice)?;
        match choice.trim() {
            "1" => search_and_save(&client, &store).await?,
            "2" => {
                match store.list_compounds() {
                    Ok(compounds) => {
                        for c in compounds {
                            println!("{} | {} | {} | {:.4} g/mol", c.cid(), c.name(), c.formula(), c.molecular_weight());
                        }
                    }
                    Err(e) => eprintln!("Error listando compuestos: {}", e),
                }
            }
            "3" => create_solution(&store)?,
            "4" => {
                match store.list_solutions() {
                    Ok(solutions) => {
                        for s in solutions {
                            println!("{} | {} | {} ingredientes", s.id(), s.name(), s.len());
                            for ing in s.ingredients() {
                                println!("    {} ({}): {} {}", ing.compound_name(), ing.compound_cid(), ing.amount(), ing.unit());
                            }
                        }
                    }
                    Err(e) => eprintln!("Error listando soluciones: {}", e),
                }
            }
            "5" => convert_amount(&store)?,
            "6" => tag_compound(&store)?,
            "7" => {
                let id_s = prompt("Id de la solución (UUID): ")?;
                let id = match Uuid::parse_str(id_s.trim()) {
                    Ok(u) => u,
                    Err(_) => { eprintln!("UUID inválido"); continue; }
                };
                match store.delete_solution(&id) {
                    Ok(()) => println!("Solución eliminada: {}", id),
                    Err(e) => eprintln!("Error eliminando solución: {}", e),
                }
            }
            "8" => {
                println!("Saliendo...");
                break;
            }
            other => {
                println!("Opción inválida: {}", other);
            }
        }
    }

    Ok(())
}

async fn search_and_save(client: &PubChemClient, store: &DieselCompoundStore) -> Result<(), Box<dyn Error>> {
    let raw = prompt("Identificador (nombre o cid numérico): ")?;
    let identifier = raw.trim();
    if identifier.is_empty() {
        eprintln!("Identificador vacío");
        return Ok(());
    }
    let kind = if identifier.chars().all(|c| c.is_ascii_digit()) { IdentifierKind::Cid } else { IdentifierKind::Name };

    let properties = match client.fetch_properties(identifier, kind).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error consultando propiedades: {}", e);
            return Ok(());
        }
    };
    println!("{} (cid {}): {}, {:.4} g/mol",
             properties.title, properties.cid, properties.formula, properties.molecular_weight);

    let compound = match Compound::new(&properties.cid,
                                       &properties.title,
                                       &properties.formula,
                                       properties.molecular_weight,
                                       &properties.name_iupac)
    {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Respuesta remota inválida para el dominio: {}", e);
            return Ok(());
        }
    };

    // La imagen y el confórmero son consultas independientes; sus fallas
    // no impiden guardar el compuesto.
    let compound = match client.fetch_image(&properties.cid).await {
        Ok(image) => compound.with_image(image),
        Err(e) => {
            eprintln!("Sin imagen 2D: {}", e);
            compound
        }
    };
    match client.fetch_conformer(&properties.cid).await {
        Ok(geometry) => println!("Confórmero '{}' con {} átomos", geometry.conformer_id, geometry.atoms.len()),
        Err(e) => eprintln!("Sin confórmero 3D: {}", e),
    }

    match store.save_compound(compound) {
        Ok(cid) => println!("Compuesto guardado: {}", cid),
        Err(e) => eprintln!("Error guardando compuesto: {}", e),
    }
    Ok(())
}

fn create_solution(store: &DieselCompoundStore) -> Result<(), Box<dyn Error>> {
    let name = prompt("Nombre de la solución: ")?;
    let mut solution = match Solution::new(name.trim()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}", e);
            return Ok(());
        }
    };
    loop {
        let cid = prompt("Cid del compuesto (enter para terminar): ")?;
        if cid.trim().is_empty() {
            break;
        }
        let compound = match store.get_compound(cid.trim()) {
            Ok(Some(c)) => c,
            Ok(None) => {
                eprintln!("No hay compuesto guardado con cid {}", cid.trim());
                continue;
            }
            Err(e) => {
                eprintln!("Error leyendo compuesto: {}", e);
                continue;
            }
        };
        let amount_s = prompt("Cantidad: ")?;
        let amount: f64 = match amount_s.trim().parse() {
            Ok(a) => a,
            Err(_) => {
                eprintln!("Cantidad inválida");
                continue;
            }
        };
        let unit_s = prompt("Unidad (gram/milligram/mole/millimole): ")?;
        let unit: Unit = match unit_s.trim().parse() {
            Ok(u) => u,
            Err(e) => {
                eprintln!("{}", e);
                continue;
            }
        };
        match SolutionIngredient::new(&compound, amount, unit, solution.id()) {
            Ok(ing) => solution.add_ingredient(ing),
            Err(e) => eprintln!("{}", e),
        }
    }
    if solution.is_empty() {
        println!("Solución vacía, no se guarda");
        return Ok(());
    }
    match store.save_solution(solution) {
        Ok(id) => println!("Solución creada: {}", id),
        Err(e) => eprintln!("Error guardando solución: {}", e),
    }
    Ok(())
}

fn convert_amount(store: &DieselCompoundStore) -> Result<(), Box<dyn Error>> {
    let cid = prompt("Cid del compuesto: ")?;
    let compound = match store.get_compound(cid.trim()) {
        Ok(Some(c)) => c,
        Ok(None) => {
            eprintln!("No hay compuesto guardado con cid {}", cid.trim());
            return Ok(());
        }
        Err(e) => {
            eprintln!("Error leyendo compuesto: {}", e);
            return Ok(());
        }
    };
    let amount_s = prompt("Cantidad: ")?;
    let amount: f64 = match amount_s.trim().parse() {
        Ok(a) => a,
        Err(_) => {
            eprintln!("Cantidad inválida");
            return Ok(());
        }
    };
    let from_s = prompt("De (gram/milligram/mole/millimole): ")?;
    let to_s = prompt("A (gram/milligram/mole/millimole): ")?;
    match (from_s.trim().parse::<Unit>(), to_s.trim().parse::<Unit>()) {
        (Ok(from), Ok(to)) => {
            let converted = convert(amount, compound.molecular_weight(), from, to);
            println!("{} {} de {} = {} {}", amount, from, compound.name(), converted, to);
        }
        (Err(e), _) | (_, Err(e)) => eprintln!("{}", e),
    }
    Ok(())
}

fn tag_compound(store: &DieselCompoundStore) -> Result<(), Box<dyn Error>> {
    let cid = prompt("Cid del compuesto: ")?;
    match store.get_compound(cid.trim()) {
        Ok(Some(_)) => {}
        Ok(None) => {
            eprintln!("No hay compuesto guardado con cid {}", cid.trim());
            return Ok(());
        }
        Err(e) => {
            eprintln!("Error leyendo compuesto: {}", e);
            return Ok(());
        }
    }
    let name = prompt("Nombre de la etiqueta: ")?;
    let mut tag = match store.get_tag(name.trim()) {
        Ok(Some(t)) => t,
        Ok(None) => match CompoundTag::new(name.trim()) {
            Ok(t) => t,
            Err(e) => {
                eprintln!("{}", e);
                return Ok(());
            }
        },
        Err(e) => {
            eprintln!("Error leyendo etiqueta: {}", e);
            return Ok(());
        }
    };
    if tag.tag(cid.trim()) {
        match store.save_tag(tag) {
            Ok(n) => println!("Etiqueta '{}' actualizada", n),
            Err(e) => eprintln!("Error guardando etiqueta: {}", e),
        }
    } else {
        println!("El compuesto ya estaba etiquetado");
    }
    Ok(())
}

fn prompt(msg: &str) -> io::Result<String> {
    print!("{}", msg);
    io::stdout().flush()?;
    let mut s = String::new();
    io::stdin().read_line(&mut s)?;
    Ok(s)
}
